use tokio_postgres::NoTls;

use crate::config::ConnectOptions;
use crate::error::SqlBridgeError;

use super::executor::PostgresExecutor;

const DEFAULT_PORT: u16 = 5432;

/// Split `host[:port]` into its parts.
///
/// An explicit `port` wins over one embedded in the host. Bracketed IPv6 hosts (`[::1]:5433`)
/// are unwrapped; bare IPv6 addresses are left alone.
#[must_use]
pub fn split_host_port(host: &str, port: Option<u16>) -> (String, u16) {
    let host = host.trim();
    let (name, embedded) = if let Some(rest) = host.strip_prefix('[') {
        match rest.split_once(']') {
            Some((addr, tail)) => (addr, tail.strip_prefix(':').and_then(|p| p.parse().ok())),
            None => (host, None),
        }
    } else {
        match host.rsplit_once(':') {
            Some((name, tail)) if !name.contains(':') => match tail.parse::<u16>() {
                Ok(parsed) => (name, Some(parsed)),
                Err(_) => (host, None),
            },
            _ => (host, None),
        }
    };
    (name.to_string(), port.or(embedded).unwrap_or(DEFAULT_PORT))
}

/// Connect to the server described by `options`.
///
/// # Errors
/// Returns `SqlBridgeError::ConnectionError` when the server is unreachable, rejects the
/// credentials, or does not answer within the connect timeout.
pub async fn connect(options: &ConnectOptions) -> Result<PostgresExecutor, SqlBridgeError> {
    let (host, port) = split_host_port(&options.host, options.port);
    let timeout = options.connect_timeout();

    let mut pg_config = tokio_postgres::Config::new();
    pg_config
        .host(&host)
        .port(port)
        .user(&options.user)
        .password(&options.password)
        .dbname(&options.database)
        .connect_timeout(timeout)
        .application_name("sql-bridge");

    let (client, connection) = tokio::time::timeout(timeout, pg_config.connect(NoTls))
        .await
        .map_err(|_| {
            SqlBridgeError::ConnectionError(format!(
                "timed out after {}s connecting to postgres at {host}:{port}",
                timeout.as_secs()
            ))
        })?
        .map_err(|e| {
            SqlBridgeError::ConnectionError(format!(
                "cannot connect to postgres at {host}:{port}: {e}"
            ))
        })?;

    let connection_task = tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(error = %e, "postgres connection terminated");
        }
    });

    tracing::debug!(%host, port, database = %options.database, "postgres connection established");
    Ok(PostgresExecutor::new(client, connection_task))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_standard_port() {
        assert_eq!(split_host_port("db.local", None), ("db.local".to_string(), 5432));
    }

    #[test]
    fn parses_embedded_port() {
        assert_eq!(split_host_port("db.local:6543", None), ("db.local".to_string(), 6543));
        assert_eq!(split_host_port("[::1]:5433", None), ("::1".to_string(), 5433));
        assert_eq!(split_host_port("[::1]", None), ("::1".to_string(), 5432));
    }

    #[test]
    fn explicit_port_wins() {
        assert_eq!(
            split_host_port("db.local:6543", Some(7000)),
            ("db.local".to_string(), 7000)
        );
    }

    #[test]
    fn leaves_bare_ipv6_alone() {
        assert_eq!(split_host_port("fe80::1", None), ("fe80::1".to_string(), 5432));
    }

    #[test]
    fn unparsable_port_stays_in_host() {
        assert_eq!(
            split_host_port("/var/run/postgresql", None),
            ("/var/run/postgresql".to_string(), 5432)
        );
    }
}
