use serde::Deserialize;
use std::env;
use std::net::SocketAddr;

// Top-level configuration container, populated from the environment
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    /// Root directory for uploaded media (show images).
    pub media_root: String,
}

impl AppConfig {
    /// Socket address the server binds, combining HOST and PORT.
    pub fn listen_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("HOST and PORT must form a valid socket address")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Bearer tokens are issued by an external identity service; we only need
// the shared secret to validate them.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .expect("PORT must be a valid number"),
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "planetarium_api=debug,tower_http=debug".to_string()),
                media_root: env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_config(host: &str, port: u16) -> AppConfig {
        AppConfig {
            host: host.to_string(),
            port,
            environment: "test".to_string(),
            rust_log: "debug".to_string(),
            media_root: "media".to_string(),
        }
    }

    #[test]
    fn listen_addr_combines_host_and_port() {
        assert_eq!(
            app_config("127.0.0.1", 9000).listen_addr(),
            "127.0.0.1:9000".parse().unwrap()
        );
        assert_eq!(
            app_config("0.0.0.0", 8000).listen_addr(),
            SocketAddr::from(([0, 0, 0, 0], 8000))
        );
    }
}
