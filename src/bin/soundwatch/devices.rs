use anyhow::Result;
use soundwatch::audio::Microphone;

/// Print the input devices cpal can see. `SOUNDWATCH_TEST_DEVICES`
/// (comma-separated) replaces the host query.
pub(crate) fn list_input_devices() -> Result<()> {
    let devices = match std::env::var("SOUNDWATCH_TEST_DEVICES") {
        Ok(raw) => parse_device_list(&raw),
        Err(_) => Microphone::list_devices().unwrap_or_else(|err| {
            eprintln!("Failed to list audio input devices: {err}");
            Vec::new()
        }),
    };

    if devices.is_empty() {
        println!("No audio input devices detected.");
    } else {
        println!("Available audio input devices:");
        for name in devices {
            println!("  - {name}");
        }
    }
    Ok(())
}

fn parse_device_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_device_list_skips_blanks() {
        assert_eq!(
            parse_device_list(" Built-in Mic, ,USB Audio "),
            vec!["Built-in Mic".to_string(), "USB Audio".to_string()]
        );
        assert!(parse_device_list("  ").is_empty());
    }
}
