/*
 *  config.rs
 *
 *  st7920-link
 *  (c) 2020-26 Stuart Hunter
 *
 *  Layered configuration: defaults, YAML file, command line
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use serde::{Deserialize, Serialize};
use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use std::{fs, path::{Path, PathBuf}};
use std::time::Duration;
use thiserror::Error;

use crate::link::gpio::{DEFAULT_CS_PIN, DEFAULT_GPIO_CHIP, DEFAULT_RESET_PIN};
use crate::link::transport::DEFAULT_SPEED_HZ;
use crate::link::{BusSettings, InputRole, MenuLines, PinAssignment};

pub const DEFAULT_REFRESH_MS: u64 = 1000;
pub const DEFAULT_WIDTH: u32 = 128;
pub const DEFAULT_HEIGHT: u32 = 64;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub refresh_ms: Option<u64>,       // clock redraw period
    pub display: Option<DisplayConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DisplayConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// draw to the recording doubles instead of hardware
    pub emulated: Option<bool>,
    pub spi: Option<SpiConfig>,
    pub pins: Option<PinConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SpiConfig {
    pub bus: Option<u8>,        // /dev/spidev<bus>.<channel>
    pub channel: Option<u8>,
    pub speed_hz: Option<u32>,
}

/// Line offsets on the GPIO character device
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PinConfig {
    pub gpio_chip: Option<String>,  // e.g. "/dev/gpiochip0"
    pub cs_pin: Option<u32>,
    pub reset_pin: Option<u32>,
    pub menu_select: Option<u32>,
    pub menu_next: Option<u32>,
    pub menu_prev: Option<u32>,
    pub menu_home: Option<u32>,
}

impl Config {
    pub fn refresh(&self) -> Duration {
        Duration::from_millis(self.refresh_ms.unwrap_or(DEFAULT_REFRESH_MS))
    }

    /// Display section, defaults when absent
    pub fn display(&self) -> DisplayConfig {
        self.display.clone().unwrap_or_default()
    }
}

impl DisplayConfig {
    pub fn geometry(&self) -> (u32, u32) {
        (self.width.unwrap_or(DEFAULT_WIDTH), self.height.unwrap_or(DEFAULT_HEIGHT))
    }

    pub fn is_emulated(&self) -> bool {
        self.emulated.unwrap_or(false)
    }

    pub fn to_bus_settings(&self) -> BusSettings {
        let defaults = BusSettings::default();
        let spi = self.spi.clone().unwrap_or_default();
        BusSettings {
            bus_index: spi.bus.unwrap_or(defaults.bus_index),
            channel: spi.channel.unwrap_or(defaults.channel),
            speed_hz: spi.speed_hz.unwrap_or(DEFAULT_SPEED_HZ),
        }
    }

    pub fn to_pin_assignment(&self) -> PinAssignment {
        let pins = self.pins.clone().unwrap_or_default();
        PinAssignment {
            cs_pin: pins.cs_pin.unwrap_or(DEFAULT_CS_PIN),
            reset_pin: pins.reset_pin.unwrap_or(DEFAULT_RESET_PIN),
            menu: MenuLines {
                select: pins.menu_select,
                next: pins.menu_next,
                prev: pins.menu_prev,
                home: pins.menu_home,
            },
        }
    }

    pub fn gpio_chip(&self) -> String {
        self.pins.as_ref()
            .and_then(|p| p.gpio_chip.clone())
            .unwrap_or_else(|| DEFAULT_GPIO_CHIP.to_string())
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "st7920-link", about = "ST7920 LCD over SPI and GPIO", version)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// shorthand for --log-level debug
    #[arg(short = 'v', long, action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub refresh_ms: Option<u64>,
    #[arg(long)]
    pub spi_bus: Option<u8>,
    #[arg(long)]
    pub spi_channel: Option<u8>,
    #[arg(long)]
    pub spi_speed_hz: Option<u32>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub gpio_chip: Option<String>,
    #[arg(long)]
    pub cs_pin: Option<u32>,
    #[arg(long)]
    pub reset_pin: Option<u32>,
    #[arg(long)]
    pub display_width: Option<u32>,
    #[arg(long)]
    pub display_height: Option<u32>,
    /// no hardware, record bus traffic in memory
    #[arg(long, action = ArgAction::SetTrue)]
    pub emulated: bool,
    /// stop after this many clock refreshes
    #[arg(long)]
    pub frames: Option<u64>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<(Config, Cli), ConfigError> {
    let cli = Cli::parse();
    let cfg = load_from(&cli)?;

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok((cfg, cli))
}

/// Layer defaults, YAML and `cli`, then validate
pub fn load_from(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;

    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/st7920-link/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/st7920-link/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/st7920-link.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["st7920-link.yaml", "config.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    // top-level
    if src.log_level.is_some()      { dst.log_level = src.log_level; }
    if src.refresh_ms.is_some()     { dst.refresh_ms = src.refresh_ms; }
    // display
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.width.is_some()       { dst.width = src.width; }
    if src.height.is_some()      { dst.height = src.height; }
    if src.emulated.is_some()    { dst.emulated = src.emulated; }
    if src.spi.is_some()         { dst.spi = src.spi; }
    if src.pins.is_some()        { dst.pins = src.pins; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()       { cfg.log_level = cli.log_level.clone(); }
    if cli.debug                     { cfg.log_level = Some("debug".into()); }
    if cli.refresh_ms.is_some()      { cfg.refresh_ms = cli.refresh_ms; }

    let display = cfg.display.get_or_insert_with(DisplayConfig::default);
    if cli.display_width.is_some()   { display.width = cli.display_width; }
    if cli.display_height.is_some()  { display.height = cli.display_height; }
    if cli.emulated                  { display.emulated = Some(true); }

    if cli.spi_bus.is_some() || cli.spi_channel.is_some() || cli.spi_speed_hz.is_some() {
        let spi = display.spi.get_or_insert_with(SpiConfig::default);
        if cli.spi_bus.is_some()      { spi.bus = cli.spi_bus; }
        if cli.spi_channel.is_some()  { spi.channel = cli.spi_channel; }
        if cli.spi_speed_hz.is_some() { spi.speed_hz = cli.spi_speed_hz; }
    }

    if cli.gpio_chip.is_some() || cli.cs_pin.is_some() || cli.reset_pin.is_some() {
        let pins = display.pins.get_or_insert_with(PinConfig::default);
        if cli.gpio_chip.is_some()    { pins.gpio_chip = cli.gpio_chip.clone(); }
        if cli.cs_pin.is_some()       { pins.cs_pin = cli.cs_pin; }
        if cli.reset_pin.is_some()    { pins.reset_pin = cli.reset_pin; }
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.refresh_ms == Some(0) {
        return Err(ConfigError::Validation("refresh_ms must be > 0".into()));
    }

    let display = cfg.display();
    match display.geometry() {
        (128, 64) | (192, 32) => {}
        (w, h) => {
            return Err(ConfigError::Validation(format!(
                "display must be 128x64 or 192x32, got {}x{}", w, h
            )));
        }
    }

    if display.to_bus_settings().speed_hz == 0 {
        return Err(ConfigError::Validation("spi speed_hz must be > 0".into()));
    }

    let pins = display.to_pin_assignment();
    if pins.cs_pin == pins.reset_pin {
        return Err(ConfigError::Validation(format!(
            "cs_pin and reset_pin are both line {}", pins.cs_pin
        )));
    }

    let mut seen = vec![pins.cs_pin, pins.reset_pin];
    for role in InputRole::ALL {
        if let Some(line) = pins.menu.line(role) {
            if seen.contains(&line) {
                return Err(ConfigError::Validation(format!(
                    "{:?} line {} is already in use", role, line
                )));
            }
            seen.push(line);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["st7920-link"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn write_yaml(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("st7920-link-{}-{}.yaml", name, std::process::id()));
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn defaults_resolve_to_the_reference_wiring() {
        let cfg = Config::default();
        let display = cfg.display();

        assert_eq!(display.geometry(), (128, 64));
        assert_eq!(display.to_bus_settings(), BusSettings { bus_index: 0, channel: 0, speed_hz: 100_000 });
        let pins = display.to_pin_assignment();
        assert_eq!((pins.cs_pin, pins.reset_pin), (7, 2));
        assert_eq!(display.gpio_chip(), "/dev/gpiochip0");
        assert_eq!(cfg.refresh(), Duration::from_secs(1));
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn yaml_then_cli_layering() {
        let path = write_yaml("layer", "\
log_level: warn
refresh_ms: 250
display:
  width: 192
  height: 32
  spi:
    bus: 1
    speed_hz: 200000
  pins:
    cs_pin: 8
    menu_next: 17
");
        let path_arg = path.to_string_lossy().to_string();
        let cfg = load_from(&cli(&["--config", &path_arg, "--spi-channel", "1", "-v"])).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
        assert_eq!(cfg.refresh(), Duration::from_millis(250));
        let display = cfg.display();
        assert_eq!(display.geometry(), (192, 32));
        assert_eq!(display.to_bus_settings(), BusSettings { bus_index: 1, channel: 1, speed_hz: 200_000 });
        let pins = display.to_pin_assignment();
        assert_eq!(pins.cs_pin, 8);
        assert_eq!(pins.reset_pin, 2);
        assert_eq!(pins.menu.next, Some(17));
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let err = load_from(&cli(&["--config", "/nonexistent/st7920-link.yaml"])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("not found")));
    }

    #[test]
    fn bad_yaml_is_reported() {
        let path = write_yaml("bad", "display: [1, 2");
        let path_arg = path.to_string_lossy().to_string();
        let err = load_from(&cli(&["--config", &path_arg])).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn validation_rejects_bad_wiring() {
        let mut cfg = Config::default();
        apply_cli_overrides(&mut cfg, &cli(&["--cs-pin", "2"]));
        assert!(validate(&cfg).is_err());

        let mut cfg = Config::default();
        apply_cli_overrides(&mut cfg, &cli(&["--spi-speed-hz", "0"]));
        assert!(validate(&cfg).is_err());

        let mut cfg = Config::default();
        apply_cli_overrides(&mut cfg, &cli(&["--display-height", "32"]));
        assert!(validate(&cfg).is_err());

        let mut cfg = Config::default();
        apply_cli_overrides(&mut cfg, &cli(&["--refresh-ms", "0"]));
        assert!(validate(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.display = Some(DisplayConfig {
            pins: Some(PinConfig { menu_home: Some(7), ..Default::default() }),
            ..Default::default()
        });
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn emulated_flag_and_dump_round_trip() {
        let mut cfg = Config::default();
        apply_cli_overrides(&mut cfg, &cli(&["--emulated", "--cs-pin", "9"]));
        assert!(cfg.display().is_emulated());

        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, cfg);
    }
}
