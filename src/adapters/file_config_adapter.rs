//! INI file configuration adapter.

use crate::domain::error::TraderError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TraderError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| TraderError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Some(true),
            "false" | "no" | "0" | "off" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_deref()
            .and_then(Self::parse_bool)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_agent_sections() {
        let content = r#"
[agent]
signature = claude-3.7-sonnet
asset_type = crypto
symbols = BTC, ETH

[date_range]
init_date = 2025-10-01
end_date = TODAY-1
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("agent", "signature"),
            Some("claude-3.7-sonnet".to_string())
        );
        assert_eq!(
            adapter.get_string("agent", "symbols"),
            Some("BTC, ETH".to_string())
        );
        assert_eq!(
            adapter.get_string("date_range", "end_date"),
            Some("TODAY-1".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[agent]\nsignature = a\n").unwrap();
        assert_eq!(adapter.get_string("agent", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_trimmed_treats_blank_as_missing() {
        let adapter = FileConfigAdapter::from_string("[agent]\nsymbols =\n").unwrap();
        assert_eq!(adapter.get_trimmed("agent", "symbols"), None);
    }

    #[test]
    fn get_int_returns_value_or_default() {
        let adapter =
            FileConfigAdapter::from_string("[session]\nstart_hour = 10\nend_hour = late\n").unwrap();
        assert_eq!(adapter.get_int("session", "start_hour", 9), 10);
        assert_eq!(adapter.get_int("session", "end_hour", 17), 17);
        assert_eq!(adapter.get_int("session", "missing", 42), 42);
    }

    #[test]
    fn get_double_returns_value_or_default() {
        let adapter =
            FileConfigAdapter::from_string("[agent]\ninitial_cash = 10000.5\nbad = x\n").unwrap();
        assert_eq!(adapter.get_double("agent", "initial_cash", 0.0), 10000.5);
        assert_eq!(adapter.get_double("agent", "bad", 99.9), 99.9);
        assert_eq!(adapter.get_double("agent", "missing", 99.9), 99.9);
    }

    #[test]
    fn get_bool_values() {
        let adapter = FileConfigAdapter::from_string(
            "[flags]\na = true\nb = Yes\nc = 0\nd = off\ne = maybe\n",
        )
        .unwrap();
        assert!(adapter.get_bool("flags", "a", false));
        assert!(adapter.get_bool("flags", "b", false));
        assert!(!adapter.get_bool("flags", "c", true));
        assert!(!adapter.get_bool("flags", "d", true));
        assert!(adapter.get_bool("flags", "e", true));
        assert!(!adapter.get_bool("flags", "missing", false));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[data]\nprice_dir = /srv/prices\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("data", "price_dir"),
            Some("/srv/prices".to_string())
        );
    }

    #[test]
    fn from_file_missing_is_config_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/config.ini")
            .err()
            .unwrap();
        assert!(matches!(err, TraderError::ConfigParse { file, .. } if file.contains("config.ini")));
    }
}
