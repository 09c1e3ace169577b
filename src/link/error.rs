/*
 *  link/error.rs
 *
 *  st7920-link
 *  (c) 2020-26 Stuart Hunter
 *
 *  Error types for the SPI transport and GPIO/timing adapters
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

use thiserror::Error;

/// Failures of the byte transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// The SPI device node could not be opened or configured
    #[error("unable to open SPI device: {0}")]
    OpenFailed(String),

    /// A write on an opened bus failed
    #[error("SPI transfer failed: {0}")]
    TransferFailed(String),

    /// `send` was called before a successful `initialize`
    #[error("SPI transport used before initialization")]
    NotInitialized,
}

/// Failures of the GPIO/timing adapter. Only setup can fail.
#[derive(Debug, Error)]
pub enum GpioError {
    #[error("GPIO setup failed: {0}")]
    SetupFailed(String),
}

/// Bring-up failure of either adapter; the link cannot be used afterwards
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Transport(TransportError),

    #[error(transparent)]
    Gpio(#[from] GpioError),
}

/// Everything the link can report to a display session
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link setup failed: {0}")]
    Setup(#[from] SetupError),

    #[error("link transfer failed: {0}")]
    Transfer(TransportError),
}

impl LinkError {
    /// True when the failure happened while bringing the link up
    pub fn is_setup(&self) -> bool {
        matches!(self, LinkError::Setup(_))
    }
}

impl From<TransportError> for LinkError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::OpenFailed(_) => LinkError::Setup(SetupError::Transport(err)),
            other => LinkError::Transfer(other),
        }
    }
}

impl From<GpioError> for LinkError {
    fn from(err: GpioError) -> Self {
        LinkError::Setup(SetupError::Gpio(err))
    }
}
