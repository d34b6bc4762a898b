use super::client::{
    EventAction, NodeInfo, OperationRequest, SvnClient, SvnError, UpdateEvent, UpdateEventHandler,
};
use crate::domain::entities::authentication::Authentication;
use crate::domain::entities::dir_entry::{DirEntry, NodeKind};
use async_trait::async_trait;
use regex::Regex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::process::Command;

/// [`SvnClient`] backed by the `svn` command line client
pub struct SvnCliClient {
    svn_executable: String,
}

impl Default for SvnCliClient {
    fn default() -> Self {
        Self {
            svn_executable: "svn".to_string(),
        }
    }
}

impl SvnCliClient {
    /// Create a new client using `svn` from `PATH`
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new client with a custom executable path
    pub fn with_executable(executable: impl Into<String>) -> Self {
        Self {
            svn_executable: executable.into(),
        }
    }

    /// Check if svn executable is available
    pub async fn check_availability(&self) -> Result<(), SvnError> {
        let output = self
            .execute_svn_command(&["--version".to_string(), "--quiet".to_string()], None, &[])
            .await?;

        if !output.status.success() {
            return Err(SvnError::ExecutableNotFound {
                executable: self.svn_executable.clone(),
            });
        }

        Ok(())
    }

    /// Execute an SVN command with a stable locale so messages can be parsed
    async fn execute_svn_command(
        &self,
        args: &[String],
        working_dir: Option<&Path>,
        env: &[(String, String)],
    ) -> Result<std::process::Output, SvnError> {
        let mut cmd = Command::new(&self.svn_executable);
        cmd.args(args)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, value) in env {
            cmd.env(key, value);
        }

        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(executable = %self.svn_executable, args = ?redact(args), "running svn");

        cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SvnError::ExecutableNotFound {
                    executable: self.svn_executable.clone(),
                }
            } else {
                SvnError::from(e)
            }
        })
    }

    /// Execute an SVN command and check for success
    async fn execute_svn_command_checked(
        &self,
        operation: &str,
        args: &[String],
        env: &[(String, String)],
    ) -> Result<String, SvnError> {
        let output = self.execute_svn_command(args, None, env).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SvnError::operation_failed(operation, stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Build authentication arguments; key material is written to private temp files
    fn build_auth_args(&self, auth: Option<&Authentication>) -> Result<AuthArgs, SvnError> {
        let mut auth_args = AuthArgs::default();
        auth_args.args.push("--non-interactive".to_string());

        match auth {
            None => {}
            Some(Authentication::Password { username, password }) => {
                auth_args.push_credentials(username, Some(password));
            }
            Some(Authentication::Ssh {
                username,
                password,
                private_key,
                passphrase,
            }) => {
                auth_args.push_credentials(username, password.as_deref());
                if let Some(key) = private_key {
                    if passphrase.as_deref().is_some_and(|p| !p.is_empty()) {
                        tracing::warn!(
                            "svn command line client cannot unlock a passphrase-protected key non-interactively"
                        );
                    }
                    let mut key_file = tempfile::Builder::new()
                        .prefix("svnscm-")
                        .suffix(".key")
                        .tempfile()?;
                    key_file.write_all(key)?;
                    auth_args.env.push((
                        "SVN_SSH".to_string(),
                        format!(
                            "ssh -l {} -i {} -o IdentitiesOnly=yes -o BatchMode=yes",
                            username,
                            key_file.path().display()
                        ),
                    ));
                    auth_args.files.push(key_file);
                }
            }
            Some(Authentication::SslClient {
                certificate,
                password,
            }) => {
                // The password goes into a private `servers` file, never onto the command line
                let config_dir = tempfile::Builder::new().prefix("svnscm-config-").tempdir()?;
                let cert_path = write_private_file(config_dir.path(), "client.p12", certificate)?;
                let servers = format!(
                    "[global]\nssl-client-cert-file = {}\nssl-client-cert-password = {}\n",
                    cert_path.display(),
                    password
                );
                write_private_file(config_dir.path(), "servers", servers.as_bytes())?;
                auth_args.args.push("--config-dir".to_string());
                auth_args.args.push(config_dir.path().display().to_string());
                auth_args.config_dir = Some(config_dir);
            }
        }

        Ok(auth_args)
    }

    fn build_tree_args(request: &OperationRequest) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(revision) = request.revision.to_svn_arg() {
            args.push("--revision".to_string());
            args.push(revision);
        }

        if let Some(depth) = request.depth.to_svn_arg() {
            args.push("--depth".to_string());
            args.push(depth.to_string());
        }

        if request.ignore_externals {
            args.push("--ignore-externals".to_string());
        }

        args
    }

    /// Run checkout/update/switch, forward events and return the resulting revision
    async fn run_tree_operation(
        &self,
        operation: &str,
        mut args: Vec<String>,
        request: &OperationRequest,
        auth: Option<&Authentication>,
        events: &mut dyn UpdateEventHandler,
    ) -> Result<u64, SvnError> {
        let auth_args = self.build_auth_args(auth)?;
        args.extend(auth_args.args.iter().cloned());

        let stdout = self
            .execute_svn_command_checked(operation, &args, &auth_args.env)
            .await?;
        let parsed = parse_tree_output(&stdout);

        for event in &parsed.events {
            events.handle_event(event);
        }

        for (path, revision) in &parsed.externals {
            let target = path.display().to_string();
            let mut event = UpdateEvent::new(EventAction::UpdateExternal, path.clone());
            // Resolve URL and kind of each fetched external
            match self.info(&target, auth).await {
                Ok(info) => {
                    event = event
                        .with_url(info.url)
                        .with_node_kind(info.kind)
                        .with_revision(revision.unwrap_or(info.revision));
                }
                Err(e) => {
                    tracing::warn!("Could not resolve external at {}: {}", target, e);
                    if let Some(revision) = revision {
                        event = event.with_revision(*revision);
                    }
                }
            }
            events.handle_event(&event);
        }

        match parsed.revision {
            Some(revision) => Ok(revision),
            None => {
                let info = self.info(&request.path.display().to_string(), auth).await?;
                Ok(info.revision)
            }
        }
    }
}

#[async_trait]
impl SvnClient for SvnCliClient {
    async fn checkout(
        &self,
        request: &OperationRequest,
        auth: Option<&Authentication>,
        events: &mut dyn UpdateEventHandler,
    ) -> Result<u64, SvnError> {
        let mut args = vec!["checkout".to_string()];
        args.extend(Self::build_tree_args(request));
        args.push(request.url.clone());
        args.push(request.path.display().to_string());

        self.run_tree_operation("checkout", args, request, auth, events)
            .await
    }

    async fn update(
        &self,
        request: &OperationRequest,
        auth: Option<&Authentication>,
        events: &mut dyn UpdateEventHandler,
    ) -> Result<u64, SvnError> {
        let mut args = vec!["update".to_string()];
        args.extend(Self::build_tree_args(request));
        args.push(request.path.display().to_string());

        self.run_tree_operation("update", args, request, auth, events)
            .await
    }

    async fn switch(
        &self,
        request: &OperationRequest,
        auth: Option<&Authentication>,
        events: &mut dyn UpdateEventHandler,
    ) -> Result<u64, SvnError> {
        let mut args = vec!["switch".to_string(), "--ignore-ancestry".to_string()];
        args.extend(Self::build_tree_args(request));
        args.push(request.url.clone());
        args.push(request.path.display().to_string());

        self.run_tree_operation("switch", args, request, auth, events)
            .await
    }

    async fn revert(&self, path: &Path) -> Result<(), SvnError> {
        let args = revert_args(path);
        self.execute_svn_command_checked("revert", &args, &[])
            .await
            .map(|_| ())
    }

    async fn info(
        &self,
        target: &str,
        auth: Option<&Authentication>,
    ) -> Result<NodeInfo, SvnError> {
        let auth_args = self.build_auth_args(auth)?;
        let mut args = vec!["info".to_string()];
        args.extend(auth_args.args.iter().cloned());
        args.push(target.to_string());

        let stdout = self
            .execute_svn_command_checked("info", &args, &auth_args.env)
            .await?;

        parse_info_output(&stdout).ok_or_else(|| SvnError::UnexpectedOutput {
            operation: "info".to_string(),
            output: stdout,
        })
    }

    async fn list(
        &self,
        url: &str,
        auth: Option<&Authentication>,
    ) -> Result<Vec<DirEntry>, SvnError> {
        let auth_args = self.build_auth_args(auth)?;
        let mut args = vec!["list".to_string(), "--verbose".to_string()];
        args.extend(auth_args.args.iter().cloned());
        args.push(url.to_string());

        let stdout = self
            .execute_svn_command_checked("list", &args, &auth_args.env)
            .await?;

        Ok(parse_list_output(&stdout))
    }
}

/// Arguments, environment and temporary files needed to authenticate one command
#[derive(Default)]
struct AuthArgs {
    args: Vec<String>,
    env: Vec<(String, String)>,
    /// Removed on drop
    #[allow(dead_code)]
    files: Vec<tempfile::NamedTempFile>,
    /// Private `--config-dir` holding the client certificate settings
    #[allow(dead_code)]
    config_dir: Option<tempfile::TempDir>,
}

impl AuthArgs {
    fn push_credentials(&mut self, username: &str, password: Option<&str>) {
        self.args.push("--username".to_string());
        self.args.push(username.to_string());
        if let Some(password) = password {
            self.args.push("--password".to_string());
            self.args.push(password.to_string());
        }
        self.args.push("--no-auth-cache".to_string());
    }
}

fn revert_args(path: &Path) -> Vec<String> {
    vec![
        "revert".to_string(),
        "--non-interactive".to_string(),
        "--recursive".to_string(),
        path.display().to_string(),
    ]
}

/// Write `contents` to `dir/name`; the file is created owner-only
fn write_private_file(dir: &Path, name: &str, contents: &[u8]) -> Result<PathBuf, SvnError> {
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    let path = dir.join(name);
    file.persist(&path).map_err(|e| SvnError::from(e.error))?;
    Ok(path)
}

/// Hide password values before logging arguments
fn redact(args: &[String]) -> Vec<String> {
    let mut redacted = Vec::with_capacity(args.len());
    let mut hide_next = false;
    for arg in args {
        if hide_next {
            redacted.push("****".to_string());
            hide_next = false;
            continue;
        }
        if arg == "--password" {
            hide_next = true;
        }
        redacted.push(arg.clone());
    }
    redacted
}

/// Output of checkout/update/switch
#[derive(Debug, Default, PartialEq, Eq)]
struct TreeOutput {
    events: Vec<UpdateEvent>,
    externals: Vec<(PathBuf, Option<u64>)>,
    revision: Option<u64>,
}

fn parse_tree_output(stdout: &str) -> TreeOutput {
    static STATUS: OnceLock<Regex> = OnceLock::new();
    static FETCH_EXTERNAL: OnceLock<Regex> = OnceLock::new();
    static EXTERNAL_DONE: OnceLock<Regex> = OnceLock::new();
    static DONE: OnceLock<Regex> = OnceLock::new();

    let status = STATUS.get_or_init(|| {
        Regex::new(r"^([ADURGCE ])([ADUCG ])([B ])([C ]) (.+)$").expect("valid status regex")
    });
    let fetch_external = FETCH_EXTERNAL.get_or_init(|| {
        Regex::new(r"^Fetching external item into '(.+)':$").expect("valid external regex")
    });
    let external_done = EXTERNAL_DONE.get_or_init(|| {
        Regex::new(
            r"^(?:External at revision|Checked out external at revision|Updated external to revision) (\d+)\.$",
        )
        .expect("valid external revision regex")
    });
    let done = DONE.get_or_init(|| {
        Regex::new(r"^(?:Checked out revision|Updated to revision|At revision) (\d+)\.$")
            .expect("valid revision regex")
    });

    let mut output = TreeOutput::default();
    let mut current_external: Option<usize> = None;

    for line in stdout.lines() {
        let line = line.trim_end();

        if let Some(caps) = fetch_external.captures(line) {
            output.externals.push((PathBuf::from(&caps[1]), None));
            current_external = Some(output.externals.len() - 1);
            continue;
        }

        if let Some(caps) = external_done.captures(line) {
            if let Some(index) = current_external.take() {
                output.externals[index].1 = caps[1].parse().ok();
            }
            continue;
        }

        if let Some(caps) = done.captures(line) {
            output.revision = caps[1].parse().ok();
            continue;
        }

        if let Some(caps) = status.captures(line) {
            let text = caps[1].chars().next().unwrap_or(' ');
            let prop = caps[2].chars().next().unwrap_or(' ');
            if text == ' ' && prop == ' ' {
                continue;
            }
            let letter = if text != ' ' { text } else { prop };
            output.events.push(
                UpdateEvent::new(EventAction::from_status_letter(letter), PathBuf::from(&caps[5]))
                    .with_expected_action(EventAction::Update),
            );
        }
    }

    output
}

fn parse_info_output(stdout: &str) -> Option<NodeInfo> {
    let mut url = None;
    let mut revision = None;
    let mut last_changed = None;
    let mut kind = NodeKind::Unknown;

    for line in stdout.lines() {
        if let Some((key, value)) = line.split_once(": ") {
            match key.trim() {
                "URL" => url = Some(value.trim().to_string()),
                "Revision" => revision = value.trim().parse::<u64>().ok(),
                "Last Changed Rev" => last_changed = value.trim().parse::<u64>().ok(),
                "Node Kind" => kind = NodeKind::parse(value),
                _ => {}
            }
        }
    }

    let revision = revision?;
    Some(NodeInfo {
        url: url?,
        revision,
        last_changed_revision: last_changed.unwrap_or(revision),
        kind,
    })
}

fn parse_list_output(stdout: &str) -> Vec<DirEntry> {
    static ENTRY: OnceLock<Regex> = OnceLock::new();
    let entry = ENTRY.get_or_init(|| {
        Regex::new(
            r"^\s*(\d+)\s+(\S+)\s+(?:\d+\s+)?[A-Z][a-z]{2}\s+\d{1,2}\s+(?:\d{2}:\d{2}|\d{4})\s(.+)$",
        )
        .expect("valid list regex")
    });

    stdout
        .lines()
        .filter_map(|line| entry.captures(line.trim_end()))
        .filter_map(|caps| {
            let revision = caps[1].parse::<u64>().ok()?;
            let raw_name = caps[3].to_string();
            if raw_name == "./" {
                return None;
            }
            let (name, kind) = match raw_name.strip_suffix('/') {
                Some(dir) => (dir.to_string(), NodeKind::Dir),
                None => (raw_name, NodeKind::File),
            };
            Some(DirEntry::new(name, kind, revision))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{depth::Depth, revision::Revision};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_checkout_output() {
        let stdout = "\
A    /ws/trunk/src
A    /ws/trunk/src/main.c
 U   /ws/trunk

Fetching external item into '/ws/trunk/lib':
A    /ws/trunk/lib/util.c
Checked out external at revision 88.

Checked out revision 120.
";
        let parsed = parse_tree_output(stdout);
        assert_eq!(parsed.revision, Some(120));
        assert_eq!(
            parsed.externals,
            vec![(PathBuf::from("/ws/trunk/lib"), Some(88))]
        );
        assert_eq!(parsed.events.len(), 4);
        assert_eq!(parsed.events[0].action, EventAction::Add);
        assert_eq!(parsed.events[2].action, EventAction::Update);
        assert_eq!(parsed.events[2].path, PathBuf::from("/ws/trunk"));
    }

    #[test]
    fn test_parse_update_at_revision() {
        let parsed = parse_tree_output("Updating '/ws/trunk':\nAt revision 7.\n");
        assert_eq!(parsed.revision, Some(7));
        assert!(parsed.events.is_empty());
    }

    #[test]
    fn test_parse_info_output() {
        let stdout = "\
Path: trunk
URL: https://svn.example.com/repo/trunk
Repository Root: https://svn.example.com/repo
Revision: 120
Node Kind: directory
Last Changed Rev: 117
";
        let info = parse_info_output(stdout).unwrap();
        assert_eq!(info.url, "https://svn.example.com/repo/trunk");
        assert_eq!(info.revision, 120);
        assert_eq!(info.last_changed_revision, 117);
        assert_eq!(info.kind, NodeKind::Dir);
        assert!(parse_info_output("garbage").is_none());
    }

    #[test]
    fn test_parse_list_output() {
        let stdout = "\
   9364 builder               Mar 01 12:00 ./
   8473 builder               Feb 11 09:12 2.1.0-10/
   9364 builder               Mar 01 12:00 2.1.0-100/
   9001 builder          1234 Jan 02  2023 README
";
        let entries = parse_list_output(stdout);
        assert_eq!(
            entries,
            vec![
                DirEntry::new("2.1.0-10", NodeKind::Dir, 8473),
                DirEntry::new("2.1.0-100", NodeKind::Dir, 9364),
                DirEntry::new("README", NodeKind::File, 9001),
            ]
        );
    }

    #[test]
    fn test_tree_args() {
        let request = OperationRequest {
            path: PathBuf::from("/ws/trunk"),
            url: "https://svn.example.com/repo/trunk".to_string(),
            revision: Revision::Number(5),
            depth: Depth::Infinity,
            ignore_externals: true,
        };
        assert_eq!(
            SvnCliClient::build_tree_args(&request),
            vec!["--revision", "5", "--depth", "infinity", "--ignore-externals"]
        );

        let request = OperationRequest {
            revision: Revision::Unspecified,
            depth: Depth::AsIs,
            ignore_externals: false,
            ..request
        };
        assert!(SvnCliClient::build_tree_args(&request).is_empty());
    }

    #[test]
    fn test_revert_never_prompts() {
        assert_eq!(
            revert_args(Path::new("/ws/trunk")),
            vec!["revert", "--non-interactive", "--recursive", "/ws/trunk"]
        );
    }

    #[test]
    fn test_redact_hides_passwords() {
        let args = vec![
            "info".to_string(),
            "--username".to_string(),
            "builder".to_string(),
            "--password".to_string(),
            "s3cret".to_string(),
        ];
        let redacted = redact(&args);
        assert!(!redacted.contains(&"s3cret".to_string()));
        assert!(redacted.contains(&"builder".to_string()));
    }

    #[test]
    fn test_password_auth_args() {
        let client = SvnCliClient::new();
        let auth = Authentication::Password {
            username: "builder".to_string(),
            password: "s3cret".to_string(),
        };
        let args = client.build_auth_args(Some(&auth)).unwrap();
        assert_eq!(args.args[0], "--non-interactive");
        assert!(args.args.contains(&"--username".to_string()));
        assert!(args.args.contains(&"s3cret".to_string()));
        assert!(args.env.is_empty());
    }

    #[test]
    fn test_ssh_key_file_is_removed_on_drop() {
        let client = SvnCliClient::new();
        let auth = Authentication::Ssh {
            username: "builder".to_string(),
            password: None,
            private_key: Some(b"-----BEGIN KEY-----".to_vec()),
            passphrase: None,
        };
        let args = client.build_auth_args(Some(&auth)).unwrap();
        let key_path = args.files[0].path().to_path_buf();
        assert!(key_path.exists());
        assert!(args.env[0].1.contains(&key_path.display().to_string()));
        drop(args);
        assert!(!key_path.exists());
    }

    #[test]
    fn test_certificate_password_stays_off_the_command_line() {
        let client = SvnCliClient::new();
        let auth = Authentication::SslClient {
            certificate: b"PKCS12".to_vec(),
            password: "cert-s3cret".to_string(),
        };
        let args = client.build_auth_args(Some(&auth)).unwrap();

        assert!(args.args.iter().all(|a| !a.contains("cert-s3cret")));
        let position = args.args.iter().position(|a| a == "--config-dir").unwrap();
        let config_dir = PathBuf::from(&args.args[position + 1]);

        let servers = std::fs::read_to_string(config_dir.join("servers")).unwrap();
        assert!(servers.starts_with("[global]\n"));
        assert!(servers.contains("ssl-client-cert-password = cert-s3cret"));
        assert_eq!(std::fs::read(config_dir.join("client.p12")).unwrap(), b"PKCS12");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(config_dir.join("servers")).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        drop(args);
        assert!(!config_dir.exists());
    }
}
