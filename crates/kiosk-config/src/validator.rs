//! Configuration validation.

use std::collections::HashMap;

use crate::error::ConfigError;
use crate::schema::{Config, DisplayKind};

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Collapse the errors into a single [`ConfigError::Invalid`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        if self.is_valid() {
            return Ok(self.warnings);
        }
        let message = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(ConfigError::Invalid(message))
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_globals(config, &mut result);
        Self::validate_displays(config, &mut result);
        Self::validate_ports(config, &mut result);

        result
    }

    fn validate_globals(config: &Config, result: &mut ValidationResult) {
        if config.debug_port == 0 {
            result.add_error(ValidationError::new("debugPort", "Port cannot be 0"));
        }

        let size_ok = config
            .new_window_size
            .split_once(',')
            .map(|(w, h)| w.trim().parse::<u32>().is_ok() && h.trim().parse::<u32>().is_ok())
            .unwrap_or(false);
        if !size_ok {
            result.add_error(ValidationError::new(
                "newWindowSize",
                format!("Expected \"<width>,<height>\", got \"{}\"", config.new_window_size),
            ));
        }

        if config.browser.is_empty() {
            result.add_error(ValidationError::new("browser", "Browser cannot be empty"));
        }

        if config.dwell_time == 0 {
            result.add_warning(ValidationWarning::new(
                "dwellTime",
                "Default dwell time is 0, tabs without their own dwell time will cycle continuously",
            ));
        }
    }

    fn validate_displays(config: &Config, result: &mut ValidationResult) {
        let mut seen: HashMap<&str, usize> = HashMap::new();

        for (i, display) in config.displays.iter().enumerate() {
            let path = format!("displays[{}]", i);

            if display.name.is_empty() {
                result.add_error(ValidationError::new(
                    format!("{}.name", path),
                    "Display name cannot be empty",
                ));
            } else if let Some(first) = seen.insert(display.name.as_str(), i) {
                result.add_error(ValidationError::new(
                    format!("{}.name", path),
                    format!("Duplicate display name \"{}\" (also displays[{}])", display.name, first),
                ));
            }

            if let Some(exec) = &display.exec {
                if exec.command.is_empty() && !exec.args.is_empty() {
                    result.add_error(ValidationError::new(
                        format!("{}.exec.command", path),
                        "Arguments given without a command",
                    ));
                }
                if !exec.command.is_empty() && !display.tabs.is_empty() {
                    result.add_error(ValidationError::new(
                        path.clone(),
                        "A display runs either tabs or a custom command, not both",
                    ));
                }
            }

            if display.kind() == DisplayKind::Empty {
                result.add_warning(ValidationWarning::new(
                    path.clone(),
                    "Display has neither tabs nor a command and will be skipped",
                ));
            }

            for (j, tab) in display.tabs.iter().enumerate() {
                if tab.url.trim().is_empty() {
                    result.add_error(ValidationError::new(
                        format!("{}.tabs[{}].url", path, j),
                        "Tab URL cannot be empty",
                    ));
                }
                if config.resolved_dwell_time(tab) == 0 {
                    result.add_warning(ValidationWarning::new(
                        format!("{}.tabs[{}].dwellTime", path, j),
                        "Dwell time is 0",
                    ));
                }
            }
        }
    }

    /// Two browser displays must never share a debug port.
    fn validate_ports(config: &Config, result: &mut ValidationResult) {
        let mut ports: HashMap<u16, &str> = HashMap::new();

        for (i, display) in config.displays.iter().enumerate() {
            if display.kind() != DisplayKind::Browser {
                continue;
            }
            let port = config.resolved_debug_port(display);
            if let Some(other) = ports.insert(port, display.name.as_str()) {
                result.add_error(ValidationError::new(
                    format!("displays[{}].debugPort", i),
                    format!("Debug port {} is already used by display \"{}\"", port, other),
                ));
            }
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
