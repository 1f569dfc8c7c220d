use std::fmt;

/// How to reach one named database instance. Descriptors are replaced, never
/// mutated: changing parameters means registering a new descriptor under the
/// same name.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub name: String,
    /// Driver tag, e.g. `MySQL`.
    pub engine: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl ConnectionDescriptor {
    pub fn new(
        name: impl Into<String>,
        engine: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            engine: engine.into(),
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
        }
    }
}

// Credentials stay out of logs.
impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("name", &self.name)
            .field("engine", &self.engine)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_password() {
        let d = ConnectionDescriptor::new("db1", "MySQL", "localhost", 3306, "root", "hunter2");
        let shown = format!("{d:?}");
        assert!(shown.contains("localhost"));
        assert!(!shown.contains("hunter2"));
    }
}
