//! Default value functions used by serde for config deserialization.

pub fn default_data_dir() -> String {
    "~/.zapcast".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_log_capacity() -> usize {
    500
}

pub fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

pub fn default_api_port() -> u16 {
    3001
}

pub fn default_body_limit_mb() -> usize {
    50
}

pub fn default_device_name() -> String {
    "ZAPCAST".to_string()
}

pub fn default_reconnect_delay_secs() -> u64 {
    5
}

pub fn default_country_code() -> String {
    "55".to_string()
}

pub fn default_pause_min_ms() -> u64 {
    2000
}

pub fn default_pause_max_ms() -> u64 {
    5000
}
