//! Human-readable error descriptions and structured JSON error formatting.

use pantilt_core::error::{BuildError, TrackerError};
use pantilt_hardware::error::HwError;

pub const EXIT_GENERIC: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_TRANSPORT: i32 = 3;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(te) = err.downcast_ref::<TrackerError>() {
        return match te {
            TrackerError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file (see etc/pantilt.toml), then rerun."
            ),
            TrackerError::TransportWrite(msg) => format!(
                "What happened: Servo commands could not be written ({msg}).\nLikely causes: Cable unplugged, microcontroller reset, or the wrong port.\nHow to fix: Check the USB connection and serial.port, then restart tracking."
            ),
            TrackerError::Source(msg) => format!(
                "What happened: The camera link is unavailable ({msg}).\nLikely causes: Wrong port, missing permissions, or serial support not compiled in.\nHow to fix: Pass --port or fix serial.port; build with --features hardware, or use --sim."
            ),
            TrackerError::State(msg) => format!(
                "What happened: {msg}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(BuildError::InvalidConfig(msg)) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: Invalid tracking settings ({msg}).\nLikely causes: Out-of-range smoothing or control values.\nHow to fix: Edit [smoothing] and [control] in the config."
        );
    }

    if let Some(hw) = err.downcast_ref::<HwError>() {
        return match hw {
            HwError::Disconnected => "What happened: The serial device is not present.\nLikely causes: Camera board unplugged or enumerated under a different name.\nHow to fix: Reconnect it and check the port name (e.g. ls /dev/tty*).".to_string(),
            HwError::Timeout => "What happened: The serial port timed out.\nLikely causes: Board not running the camera firmware, or baud mismatch.\nHow to fix: Check serial.baud matches the firmware (default 1500000).".to_string(),
            other => format!(
                "What happened: Failed to use the serial port ({other}).\nLikely causes: Insufficient permissions or the port is in use.\nHow to fix: Add your user to the dialout group or close other programs using the port."
            ),
        };
    }

    if err.downcast_ref::<toml::de::Error>().is_some() {
        return format!(
            "What happened: The config file is not valid TOML for this program.\nLikely causes: Typo, missing [serial] section, or an unknown value.\nHow to fix: Compare with etc/pantilt.toml. Details: {err:#}"
        );
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable process exit codes: config 2, transport 3, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<toml::de::Error>().is_some()
        || err.downcast_ref::<BuildError>().is_some()
    {
        return EXIT_CONFIG;
    }
    if err.downcast_ref::<HwError>().is_some() {
        return EXIT_TRANSPORT;
    }
    match err.downcast_ref::<TrackerError>() {
        Some(TrackerError::Config(_)) => EXIT_CONFIG,
        Some(TrackerError::TransportWrite(_) | TrackerError::Source(_)) => EXIT_TRANSPORT,
        _ => EXIT_GENERIC,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(te) = err.downcast_ref::<TrackerError>() {
        return match te {
            TrackerError::Config(_) => "Config",
            TrackerError::TransportWrite(_) => "TransportWrite",
            TrackerError::Source(_) => "Source",
            TrackerError::State(_) => "State",
        };
    }
    if err.downcast_ref::<toml::de::Error>().is_some() || err.downcast_ref::<BuildError>().is_some()
    {
        return "Config";
    }
    if err.downcast_ref::<HwError>().is_some() {
        return "Hardware";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;
    use rstest::rstest;

    #[rstest]
    #[case(TrackerError::Config("x".into()), EXIT_CONFIG)]
    #[case(TrackerError::TransportWrite("x".into()), EXIT_TRANSPORT)]
    #[case(TrackerError::Source("x".into()), EXIT_TRANSPORT)]
    #[case(TrackerError::State("x".into()), EXIT_GENERIC)]
    fn tracker_errors_map_to_exit_codes(#[case] e: TrackerError, #[case] code: i32) {
        assert_eq!(exit_code_for_error(&eyre::Report::new(e)), code);
    }

    #[test]
    fn context_does_not_hide_the_typed_error() {
        let r: Result<(), _> = Err(HwError::Disconnected);
        let err = r.wrap_err("open serial port /dev/ttyACM0").unwrap_err();
        assert_eq!(exit_code_for_error(&err), EXIT_TRANSPORT);
        assert!(humanize(&err).contains("not present"));
    }

    #[test]
    fn json_error_has_reason_and_code() {
        let err = eyre::Report::new(TrackerError::Config("serial.port must not be empty".into()));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Config");
        assert_eq!(v["exit_code"], 2);
        assert!(v["message"].as_str().unwrap().contains("serial.port"));
    }

    #[test]
    fn unknown_errors_fall_back_to_generic() {
        let err = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&err), EXIT_GENERIC);
        assert!(humanize(&err).contains("Original: boom"));
    }
}
