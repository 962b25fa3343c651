// src/banner.rs

/// Copyleft notice shown before connecting when verbosity is enabled.
pub fn notice() -> String {
    format!(
        r#"
atd-submit {}  Submit a sample to an analysis appliance and report its verdict
This program comes with ABSOLUTELY NO WARRANTY. It is free software, and you
are welcome to redistribute it under certain conditions.
"#,
        env!("CARGO_PKG_VERSION")
    )
}
