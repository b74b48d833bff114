use std::path::Path;

/// Render the site definition for `hostname`. Listens on plain
/// HTTP only; the certificate client adds TLS to it later.
#[must_use]
pub fn render_site(hostname: &str, access_log: &Path, fragment_dir: &Path) -> String {
    format!(
        "server {{\n\
         \tlisten 80;\n\
         \tlisten [::]:80;\n\
         \tserver_name {hostname};\n\
         \n\
         \taccess_log {log};\n\
         \n\
         \tinclude {fragments}/*.nginx;\n\
         }}\n",
        log = access_log.display(),
        fragments = fragment_dir.display(),
    )
}

/// Render the per-application fragment forwarding everything to the
/// container on `port`, websocket upgrades included.
#[must_use]
pub fn render_fragment(port: u16) -> String {
    format!(
        "location / {{\n\
         \tproxy_pass http://127.0.0.1:{port};\n\
         \tproxy_set_header Host $host;\n\
         \tproxy_set_header X-Forwarded-Host $host;\n\
         \tproxy_set_header X-Real-IP $remote_addr;\n\
         \tproxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;\n\
         \tproxy_set_header X-Forwarded-Proto $scheme;\n\
         \tproxy_http_version 1.1;\n\
         \tproxy_set_header Upgrade $http_upgrade;\n\
         \tproxy_set_header Connection \"Upgrade\";\n\
         \tclient_max_body_size 30m;\n\
         }}\n"
    )
}
