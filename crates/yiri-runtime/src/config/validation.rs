//! Configuration validation utilities.

use std::collections::HashSet;

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, LogOutput, LoggingConfig, YiriConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &YiriConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_bots_config(&config.bots)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    for target in logging.filters.keys() {
        if target.is_empty() || target.contains(char::is_whitespace) {
            return Err(ConfigError::validation(format!(
                "Invalid log filter target: {target:?}"
            )));
        }
    }

    Ok(())
}

fn validate_bots_config(bots: &[BotConfig]) -> ConfigResult<()> {
    let mut seen_ids = HashSet::new();

    for bot in bots {
        if !seen_ids.insert(&bot.id) {
            return Err(ConfigError::DuplicateBotId(bot.id.clone()));
        }

        validate_bot_config(bot)?;
    }

    Ok(())
}

fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    if bot.id.is_empty() {
        return Err(ConfigError::missing_field("bot.id"));
    }

    if bot.id.contains(' ') {
        return Err(ConfigError::validation("Bot ID cannot contain spaces"));
    }

    if bot.adapter.is_empty() {
        return Err(ConfigError::missing_field("bot.adapter"));
    }

    if bot.qq <= 0 {
        return Err(ConfigError::InvalidAccount {
            id: bot.id.clone(),
            qq: bot.qq,
        });
    }

    if !(bot.settings.is_null() || bot.settings.is_object()) {
        return Err(ConfigError::validation(format!(
            "Settings of bot '{}' must be a table",
            bot.id
        )));
    }

    Ok(())
}
