//! Docker Compose file generation

use secrecy::ExposeSecret;

use crate::models::deployment::ActiveDeployment;
use crate::storage::settings::Settings;

const SERVICE_IMAGE: &str = "specifyconsortium/specify7-service";
const SCHEMA_IMAGE: &str = "specifyconsortium/specify6-service";

/// Values passed through to every instance and worker container
#[derive(Clone, Default)]
pub struct ComposeEnvironment {
    pub database_host: String,
    pub master_name: String,
    pub master_password: String,
    pub secret_key: String,
    pub asset_server_url: String,
    pub asset_server_key: String,
    pub asset_server_collection: String,
    pub report_runner_host: String,
}

impl ComposeEnvironment {
    pub fn from_settings(settings: &Settings) -> Self {
        let expose = |secret: &Option<secrecy::SecretString>| {
            secret
                .as_ref()
                .map(|secret| secret.expose_secret().to_string())
                .unwrap_or_default()
        };
        Self {
            database_host: settings.mysql.host.clone(),
            master_name: settings.mysql.username.clone(),
            master_password: expose(&settings.mysql.password),
            secret_key: expose(&settings.compose.secret_key),
            asset_server_url: settings.compose.asset_server_url.clone(),
            asset_server_key: expose(&settings.compose.asset_server_key),
            asset_server_collection: settings.compose.asset_server_collection.clone(),
            report_runner_host: settings.compose.report_runner_host.clone(),
        }
    }
}

/// Image tag published for a branch
pub fn branch_to_tag(branch: &str) -> String {
    branch.replace('/', "-")
}

fn resolve_image(deployment: &ActiveDeployment) -> String {
    match &deployment.digest {
        Some(digest) => format!("{}@{}", SERVICE_IMAGE, digest),
        None => format!("{}:{}", SERVICE_IMAGE, branch_to_tag(&deployment.branch)),
    }
}

/// Distinct schema versions in order of first use
fn schema_versions(deployments: &[ActiveDeployment]) -> Vec<&str> {
    let mut versions: Vec<&str> = Vec::new();
    for deployment in deployments {
        if !versions.contains(&deployment.schema_version.as_str()) {
            versions.push(&deployment.schema_version);
        }
    }
    versions
}

fn environment(deployment: &ActiveDeployment, env: &ComposeEnvironment) -> String {
    [
        format!("DATABASE_NAME={}", deployment.database),
        format!("DATABASE_HOST={}", env.database_host),
        format!("MASTER_NAME={}", env.master_name),
        format!("MASTER_PASSWORD={}", env.master_password),
        format!("SECRET_KEY={}", env.secret_key),
        format!("ASSET_SERVER_URL={}", env.asset_server_url),
        format!("ASSET_SERVER_KEY={}", env.asset_server_key),
        format!("ASSET_SERVER_COLLECTION={}", env.asset_server_collection),
        format!("REPORT_RUNNER_HOST={}", env.report_runner_host),
        "REPORT_RUNNER_PORT=8080".to_string(),
        "CELERY_BROKER_URL=redis://redis/0".to_string(),
        "CELERY_RESULT_BACKEND=redis://redis/1".to_string(),
        format!("CELERY_TASK_QUEUE={}", deployment.hostname),
        "SP7_DEBUG=true".to_string(),
        "LOG_LEVEL=DEBUG".to_string(),
    ]
    .iter()
    .map(|line| format!("      - {}\n", line))
    .collect()
}

fn instance_services(deployment: &ActiveDeployment, env: &ComposeEnvironment) -> String {
    let hostname = &deployment.hostname;
    let image = resolve_image(deployment);
    let schema_version = &deployment.schema_version;
    let environment = environment(deployment, env);

    format!(
        r#"  {hostname}:
    image: {image}
    init: true
    restart: unless-stopped
    networks:
      - database
      - nginx
      - redis
    volumes:
      - "specify{schema_version}:/opt/Specify:ro"
      - "{hostname}-static-files:/volumes/static-files"
    environment:
{environment}
  {hostname}-worker:
    image: {image}
    command: ve/bin/celery -A specifyweb worker -l INFO --concurrency=1 -Q {hostname}
    init: true
    restart: unless-stopped
    volumes:
      - "specify{schema_version}:/opt/Specify:ro"
    networks:
      - redis
      - database
    environment:
      - LC_ALL=C.UTF-8
      - LANG=C.UTF-8
{environment}"#
    )
}

/// Render the compose file for `deployments`.
///
/// `nginx_config_hash` is set on the nginx service so that it is recreated
/// whenever the generated nginx config changes.
pub fn create_docker_config(
    deployments: &[ActiveDeployment],
    nginx_config_hash: &str,
    env: &ComposeEnvironment,
) -> String {
    let versions = schema_versions(deployments);
    let mut config = String::from("services:\n");

    if deployments.is_empty() {
        config.push_str("  mariadb:\n    restart: unless-stopped\n");
    }

    for deployment in deployments {
        config.push('\n');
        config.push_str(&instance_services(deployment, env));
    }

    for version in &versions {
        config.push_str(&format!(
            "\n  specify{version}:\n    image: {SCHEMA_IMAGE}:{version}\n    volumes:\n      - \"specify{version}:/volumes/Specify\"\n"
        ));
    }

    config.push_str(&format!(
        "\n  nginx:\n    environment:\n      - CONFIG_HASH={}\n    volumes:\n",
        nginx_config_hash
    ));
    for deployment in deployments {
        config.push_str(&format!(
            "      - \"{0}-static-files:/volumes/{0}-static-files:ro\"\n",
            deployment.hostname
        ));
    }
    for version in &versions {
        config.push_str(&format!(
            "      - \"specify{0}:/volumes/specify{0}:ro\"\n",
            version
        ));
    }

    config.push_str("\nvolumes:\n");
    for deployment in deployments {
        config.push_str(&format!("  {}-static-files:\n", deployment.hostname));
    }
    for version in &versions {
        config.push_str(&format!("  specify{}:\n", version));
    }

    config
}
