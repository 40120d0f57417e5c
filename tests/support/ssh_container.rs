// ABOUTME: Password-authenticated OpenSSH server in Docker for integration tests.
// ABOUTME: One container per test binary, removed when the process exits.

use bollard::Docker;
use bollard::models::{ContainerCreateBody, HostConfig, PortBinding};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, RemoveContainerOptions, StartContainerOptions,
};
use futures::StreamExt;
use secrecy::SecretString;
use sshrun::ssh::ConnectionParams;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::io::AsyncReadExt;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const IMAGE: &str = "lscr.io/linuxserver/openssh-server:latest";
const SSH_PORT: u16 = 2222;
const TEST_USER: &str = "testuser";
const TEST_PASSWORD: &str = "testpass";

static CONTAINER_ID: OnceLock<String> = OnceLock::new();
static SHARED: tokio::sync::OnceCell<SshContainer> = tokio::sync::OnceCell::const_new();

#[ctor::dtor]
fn remove_container() {
    let Some(id) = CONTAINER_ID.get() else {
        return;
    };
    let Ok(rt) = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    else {
        return;
    };
    rt.block_on(async {
        if let Ok(docker) = Docker::connect_with_local_defaults() {
            let options = RemoveContainerOptions {
                force: true,
                ..Default::default()
            };
            let _ = docker.remove_container(id, Some(options)).await;
        }
    });
}

/// The SSH server shared by every test in the binary.
pub async fn shared_container() -> &'static SshContainer {
    SHARED
        .get_or_init(|| async {
            SshContainer::start()
                .await
                .expect("failed to start SSH container")
        })
        .await
}

pub struct SshContainer {
    port: u16,
    /// Keys are learned here on first connect.
    known_hosts: tempfile::TempDir,
}

impl SshContainer {
    async fn start() -> Result<Self, BoxError> {
        let docker = Docker::connect_with_local_defaults()?;

        let pull = CreateImageOptions {
            from_image: Some(IMAGE.to_string()),
            ..Default::default()
        };
        let mut progress = docker.create_image(Some(pull), None, None);
        while let Some(step) = progress.next().await {
            step?;
        }

        let port = free_port().await?;
        let body = ContainerCreateBody {
            image: Some(IMAGE.to_string()),
            env: Some(vec![
                "PUID=1000".to_string(),
                "PGID=1000".to_string(),
                format!("USER_NAME={TEST_USER}"),
                "PASSWORD_ACCESS=true".to_string(),
                format!("USER_PASSWORD={TEST_PASSWORD}"),
            ]),
            host_config: Some(HostConfig {
                port_bindings: Some(HashMap::from([(
                    format!("{SSH_PORT}/tcp"),
                    Some(vec![PortBinding {
                        host_ip: Some("127.0.0.1".to_string()),
                        host_port: Some(port.to_string()),
                    }]),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        };
        let create = CreateContainerOptions {
            name: Some(format!("sshrun-ssh-test-{}", std::process::id())),
            ..Default::default()
        };

        let id = docker.create_container(Some(create), body).await?.id;
        let _ = CONTAINER_ID.set(id.clone());
        docker
            .start_container(&id, None::<StartContainerOptions>)
            .await?;

        wait_for_banner(port).await?;

        Ok(Self {
            port,
            known_hosts: tempfile::tempdir()?,
        })
    }

    /// Parameters for the test user, trusting the server key on first use.
    pub fn params(&self) -> ConnectionParams {
        self.params_with_password(TEST_PASSWORD)
    }

    pub fn params_with_password(&self, password: &str) -> ConnectionParams {
        ConnectionParams::configure(
            format!("127.0.0.1:{}", self.port),
            TEST_USER,
            SecretString::new(password.to_string()),
        )
        .known_hosts_path(self.known_hosts.path().join("known_hosts"))
        .trust_on_first_use(true)
    }
}

async fn free_port() -> Result<u16, BoxError> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    Ok(listener.local_addr()?.port())
}

/// Poll until the server sends its `SSH-` identification line.
async fn wait_for_banner(port: u16) -> Result<(), BoxError> {
    for _ in 0..60 {
        if let Ok(mut stream) = tokio::net::TcpStream::connect(("127.0.0.1", port)).await {
            let mut banner = [0u8; 4];
            let read = tokio::time::timeout(Duration::from_secs(2), stream.read_exact(&mut banner));
            if matches!(read.await, Ok(Ok(_))) && &banner == b"SSH-" {
                // sshd accepts before the user is fully provisioned
                tokio::time::sleep(Duration::from_millis(500)).await;
                return Ok(());
            }
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    Err("SSH server did not come up in time".into())
}
