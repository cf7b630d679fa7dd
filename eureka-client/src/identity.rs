use std::fmt;

use uuid::Uuid;

/// Basic-auth credentials for the registry.
#[derive(Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_owned(),
            password: password.to_owned(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Who we are to the registry. Created once per agent and never mutated.
#[derive(Clone, Debug)]
pub struct InstanceIdentity {
    app_name: String,
    instance_id: String,
    port: u16,
    credentials: Credentials,
}

impl InstanceIdentity {
    /// Generate a new identity. The instance id is `{app_name}:{uuid}`.
    pub fn new(app_name: &str, port: u16, credentials: Credentials) -> Self {
        Self {
            app_name: app_name.to_owned(),
            instance_id: format!("{}:{}", app_name, Uuid::now_v7()),
            port,
            credentials,
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_id_is_prefixed_with_app_name() {
        let identity = InstanceIdentity::new("MY-SERVICE", 8080, Credentials::default());

        let (app, id) = identity
            .instance_id()
            .split_once(':')
            .expect("instance id should contain a separator");
        assert_eq!(app, "MY-SERVICE");
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[test]
    fn test_instance_ids_are_unique() {
        let one = InstanceIdentity::new("svc", 8080, Credentials::default());
        let two = InstanceIdentity::new("svc", 8080, Credentials::default());

        assert_ne!(one.instance_id(), two.instance_id());
    }

    #[test]
    fn test_debug_hides_password() {
        let credentials = Credentials::new("admin", "hunter2");

        let debugged = format!("{:?}", credentials);
        assert!(debugged.contains("admin"));
        assert!(!debugged.contains("hunter2"));
    }
}
