/*
 *  main.rs
 *
 *  st7920-link
 *  (c) 2020-26 Stuart Hunter
 *
 *  Clock demo on an ST7920 128x64 LCD
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

use anyhow::Context;
use env_logger::Env;
use log::{error, info};

use st7920_link::config::{self, Config};
use st7920_link::demo;
use st7920_link::display::DisplayDriverFactory;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

fn run(cfg: &Config, frames: Option<u64>) -> anyhow::Result<()> {
    let display = cfg.display();
    let mut driver = DisplayDriverFactory::create_from_config(&display)
        .context("creating ST7920 driver")?;

    let sent = demo::run(driver.as_mut(), cfg.refresh(), frames)
        .context("display session ended")?;
    info!("Sent {} frames, exiting", sent);
    Ok(())
}

fn main() {
    let (cfg, cli) = match config::load() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}: {}", env!("CARGO_PKG_NAME"), e);
            std::process::exit(1);
        }
    };

    let level = cfg.log_level.clone().unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("{} v.{} built {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), BUILD_DATE);

    if let Err(e) = run(&cfg, cli.frames) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
