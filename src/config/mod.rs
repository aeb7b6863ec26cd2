// ABOUTME: Configuration management modules for the booking service
// ABOUTME: Environment-only configuration, no config file parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

//! Configuration management

/// Environment-based server configuration
pub mod environment;
