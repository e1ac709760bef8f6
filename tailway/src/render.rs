use owo_colors::OwoColorize;
use tailway_core::channel::LogChannel;
use tailway_core::record::{LogLevel, LogRecord};

pub fn render_record(record: &LogRecord) {
    let ts = record.timestamp.format("%H:%M:%S%.3f");
    let level = record.level.map(|l| l.as_str()).unwrap_or("-");

    let level = match record.level {
        Some(LogLevel::Debug) => level.dimmed().to_string(),
        Some(LogLevel::Info) => level.green().to_string(),
        Some(LogLevel::Warning) => level.yellow().to_string(),
        Some(LogLevel::Error) => level.red().to_string(),
        Some(LogLevel::Critical) => level.red().bold().to_string(),
        None => level.to_string(),
    };

    if record.source_tag.is_empty() {
        println!("{ts} [{level}] {}", record.message);
    } else {
        println!(
            "{ts} [{level}] {} ({})",
            record.message,
            record.source_tag.dimmed()
        );
    }
}

pub fn render_record_raw(record: &LogRecord) {
    match serde_json::to_string(record) {
        Ok(json) => println!("{json}"),
        Err(_) => println!("{}", record.message),
    }
}

pub fn render_channels(channels: &[LogChannel]) {
    println!(
        "{:<14} {:<18} {:<16} {:>10}  {}",
        "KEY", "FILE", "GROUP", "SIZE", "STATUS"
    );
    for channel in channels {
        let status = if channel.exists {
            "ok".green().to_string()
        } else {
            "missing".red().to_string()
        };
        println!(
            "{:<14} {:<18} {:<16} {:>10}  {}",
            channel.key,
            channel.filename,
            channel.group_label,
            channel.size_bytes,
            status
        );
    }
}
