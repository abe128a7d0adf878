// ABOUTME: Non-protocol HTTP routes
// ABOUTME: Currently health and readiness endpoints only
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

//! Auxiliary HTTP routes

/// Health and readiness endpoints
pub mod health;
