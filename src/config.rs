use std::env;

use crate::models::SlotGrid;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub slot_grid: SlotGrid,
    pub cors_allow_any: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let slot_grid = SlotGrid::new(
            &env::var("SLOT_FIRST").unwrap_or_else(|_| "09:00".to_string()),
            &env::var("SLOT_LAST").unwrap_or_else(|_| "17:30".to_string()),
            env::var("SLOT_INTERVAL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        )?;

        Ok(Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "salon.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            slot_grid,
            cors_allow_any: env::var("CORS_ALLOW_ANY")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        })
    }
}
