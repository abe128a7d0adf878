// ABOUTME: Configuration module exposing environment-driven server settings
// ABOUTME: All configuration is environment-only; there is no config file format
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

//! Configuration management

/// Environment-based configuration
pub mod environment;
