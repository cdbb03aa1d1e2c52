use serde::Deserialize;
use std::env;

use crate::engine::{DEFAULT_EXP_DOWNVOTE, DEFAULT_EXP_UPVOTE};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub host: String,
    pub allowed_origins: Vec<String>,
    /// EXP granted to an author when their content receives a brand-new
    /// upvote.
    pub exp_upvote: i64,
    /// EXP applied on a brand-new downvote. Typically negative.
    pub exp_downvote: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            exp_upvote: env::var("EXP_UPVOTE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_EXP_UPVOTE),
            exp_downvote: env::var("EXP_DOWNVOTE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_EXP_DOWNVOTE),
        })
    }
}
