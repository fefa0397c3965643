// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course-Paywall: backend for a paywalled video course
//!
//! This crate provides the API behind the course site: Google sign-in,
//! Stripe checkout for the premium plan, lesson delivery, watch progress
//! and member statistics.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use services::{GoogleOAuthClient, StripeClient};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub google: GoogleOAuthClient,
    pub stripe: StripeClient,
}

impl AppState {
    /// State backed by an in-memory store.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        Self::with_db(config, Database::in_memory())
    }

    pub fn with_db(config: Config, db: Database) -> anyhow::Result<Self> {
        let google = GoogleOAuthClient::new(&config)?;
        let stripe = StripeClient::new(&config)?;
        Ok(Self {
            config,
            db,
            google,
            stripe,
        })
    }
}
