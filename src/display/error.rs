/*
 *  display/error.rs
 *
 *  st7920-link
 *  (c) 2020-26 Stuart Hunter
 *
 *  Unified error types for display subsystem
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

use std::convert::Infallible;
use std::fmt;
use std::error::Error;

use crate::link::LinkError;

/// Unified error type for all display operations
#[derive(Debug)]
pub enum DisplayError {
    /// Transport or GPIO failure underneath the driver
    Link(LinkError),

    /// Invalid configuration
    InvalidConfiguration(String),

    /// Framebuffer size mismatch
    BufferSizeMismatch { expected: usize, actual: usize },
}

impl DisplayError {
    /// True when the link never came up (bus open or GPIO setup)
    pub fn is_setup_failure(&self) -> bool {
        matches!(self, DisplayError::Link(err) if err.is_setup())
    }
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::Link(err) =>
                write!(f, "{}", err),
            DisplayError::InvalidConfiguration(msg) =>
                write!(f, "Invalid configuration: {}", msg),
            DisplayError::BufferSizeMismatch { expected, actual } =>
                write!(f, "Buffer size mismatch: expected {} bytes, got {}", expected, actual),
        }
    }
}

impl Error for DisplayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DisplayError::Link(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LinkError> for DisplayError {
    fn from(err: LinkError) -> Self {
        DisplayError::Link(err)
    }
}

// Framebuffer drawing cannot fail
impl From<Infallible> for DisplayError {
    fn from(err: Infallible) -> Self {
        match err {}
    }
}

/// Factory error types
#[derive(Debug)]
pub enum DisplayFactoryError {
    /// Display driver could not be built from the configuration
    DriverInitFailed(DisplayError),
}

impl fmt::Display for DisplayFactoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayFactoryError::DriverInitFailed(err) =>
                write!(f, "Driver initialization failed: {}", err),
        }
    }
}

impl Error for DisplayFactoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DisplayFactoryError::DriverInitFailed(err) => Some(err),
        }
    }
}

impl From<DisplayError> for DisplayFactoryError {
    fn from(err: DisplayError) -> Self {
        DisplayFactoryError::DriverInitFailed(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{GpioError, TransportError};

    #[test]
    fn setup_failures_are_recognised_through_the_wrapper() {
        let err = DisplayError::from(LinkError::from(GpioError::SetupFailed("busy".into())));
        assert!(err.is_setup_failure());
        assert!(err.source().is_some());

        let err = DisplayError::from(LinkError::from(TransportError::TransferFailed("EIO".into())));
        assert!(!err.is_setup_failure());
    }

    #[test]
    fn factory_error_keeps_driver_error_as_source() {
        let err = DisplayFactoryError::from(DisplayError::InvalidConfiguration("64x64".into()));
        assert!(err.to_string().contains("64x64"));
        assert!(err.source().is_some());
    }

    #[test]
    fn messages_name_the_failure() {
        let err = DisplayError::BufferSizeMismatch { expected: 1024, actual: 512 };
        assert_eq!(err.to_string(), "Buffer size mismatch: expected 1024 bytes, got 512");
        assert!(err.source().is_none());

        let err = DisplayError::from(LinkError::from(TransportError::NotInitialized));
        assert!(matches!(err, DisplayError::Link(LinkError::Transfer(TransportError::NotInitialized))));
    }
}
