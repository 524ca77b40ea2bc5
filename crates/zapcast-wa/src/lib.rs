//! # zapcast-wa
//!
//! WhatsApp session client for the zapcast bridge: pure Rust via
//! `whatsapp-rust` (WhatsApp Web protocol: Noise handshake + Signal
//! encryption). Pairing is done by scanning a QR code, like WhatsApp Web.
//! Session state is persisted to `{data_dir}/wa_session/session.db`.

mod bot;
pub mod qr;
mod send;
mod session;
mod store;


pub use session::WaSession;
