//! Nginx reverse proxy config generation

use crate::models::deployment::ActiveDeployment;

const CORS_HEADERS: &str = r#"        if ($request_method = 'GET') {
           add_header 'Access-Control-Allow-Origin' '*';
           add_header 'Access-Control-Allow-Methods' 'GET, POST, OPTIONS';
           add_header 'Access-Control-Allow-Headers' 'DNT,User-Agent,X-Requested-With,If-Modified-Since,Cache-Control,Content-Type,Range';
           add_header 'Access-Control-Expose-Headers' 'Content-Length,Content-Range';
        }"#;

fn server_block(deployment: &ActiveDeployment, host: &str) -> String {
    let hostname = &deployment.hostname;
    let schema_version = &deployment.schema_version;

    format!(
        r#"server {{
    listen 443 ssl;
    server_name {hostname}.{host};
    root /usr/share/nginx;

    ssl_certificate /etc/letsencrypt/live/test.specifysystems.org/fullchain.pem;
    ssl_certificate_key /etc/letsencrypt/live/test.specifysystems.org/privkey.pem;
    ssl_session_cache shared:SSL:10m;
    ssl_session_timeout 5m;
    ssl_prefer_server_ciphers on;
    client_max_body_size 128M;

    location /static/ {{
{CORS_HEADERS}
        root /volumes;
        rewrite ^/static/config/(.*)$ /specify{schema_version}/config/$1 break;
        rewrite ^/static/depository/(.*)$ /{hostname}-static-files/depository/$1 break;
        rewrite ^/static/(.*)$ /{hostname}-static-files/frontend-static/$1 break;
    }}

    location / {{
{CORS_HEADERS}
        resolver 127.0.0.11 valid=30s;
        set $backend "http://{hostname}:8000";
        proxy_pass $backend;
        proxy_set_header Host $host;
        proxy_set_header X-Real-IP $remote_addr;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
    }}
}}"#
    )
}

/// One `server` block per deployment, served at `<hostname>.<host>`
pub fn create_nginx_config(deployments: &[ActiveDeployment], host: &str) -> String {
    deployments
        .iter()
        .map(|deployment| server_block(deployment, host))
        .collect::<Vec<_>>()
        .join("\n\n")
}
