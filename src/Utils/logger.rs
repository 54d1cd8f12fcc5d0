use chrono::Local;
use simplelog::*;
use std::fs::File;
use std::path::Path;

/// maps a loglevel string onto a filter; "off" and "none" silence the engine
pub fn parse_loglevel(level: &str) -> Option<LevelFilter> {
    match level.trim().to_lowercase().as_str() {
        "debug" => Some(LevelFilter::Debug),
        "info" => Some(LevelFilter::Info),
        "warn" => Some(LevelFilter::Warn),
        "error" => Some(LevelFilter::Error),
        "off" | "none" => Some(LevelFilter::Off),
        _ => None,
    }
}

/// Installs a terminal logger and, if `log_dir` is given, a file logger writing
/// `log_<date>_<time>.txt` into that directory.
///
/// Returns false if the level is unknown or a global logger is already installed; a second call
/// is harmless.
pub fn init_logger(loglevel: &str, log_dir: Option<&Path>) -> bool {
    let log_option = match parse_loglevel(loglevel) {
        Some(level) => level,
        None => return false,
    };
    if log_option == LevelFilter::Off {
        return false;
    }
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        log_option,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(dir) = log_dir {
        let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let name = dir.join(format!("log_{}.txt", date_and_time));
        match File::create(&name) {
            Ok(file) => loggers.push(WriteLogger::new(log_option, Config::default(), file)),
            Err(err) => eprintln!("cannot create log file {}: {}", name.display(), err),
        }
    }
    CombinedLogger::init(loggers).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_loglevel() {
        assert_eq!(parse_loglevel("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_loglevel(" Warn "), Some(LevelFilter::Warn));
        assert_eq!(parse_loglevel("none"), Some(LevelFilter::Off));
        assert_eq!(parse_loglevel("verbose"), None);
    }

    #[test]
    fn test_off_and_unknown_do_not_install() {
        assert!(!init_logger("off", None));
        assert!(!init_logger("loud", None));
    }
}
