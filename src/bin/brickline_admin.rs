//!
//! brickline admin CLI
//! -------------------
//! Operator tool for the admin back-office of a running brickline server:
//! list the user directory, change roles and verification flags, and move
//! listings through the approval queue. Authenticates with the same session
//! cookie the browser surface uses.

use std::env;

use anyhow::{anyhow, Context, Result};
use reqwest::Url;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} --connect <url> --user <u> --password <p> <command>\n\nFlags:\n  --connect <url>   Server base URL (default: http://127.0.0.1:7878)\n  --user <u>        Admin username\n  --password <p>    Admin password\n  -h, --help        Show this help\n\nCommands:\n  users                      list the user directory\n  promote <user_id> <role>   set a profile's role (user | agent | admin)\n  verify <user_id> <bool>    set a profile's verified flag\n  approve <listing_id>       approve a pending listing\n  reject <listing_id>        reject a listing\n\nExamples:\n  {program} --user admin --password brickline users\n  {program} --user admin --password brickline promote ada agent\n  {program} --user admin --password brickline approve 6d1f0c3e-...-a1b2"
    );
}

struct HttpSession {
    base: Url,
    client: reqwest::Client,
}

impl HttpSession {
    async fn connect(base: &str, user: &str, pass: &str) -> Result<Self> {
        let base_url = Url::parse(base).context("invalid base URL")?;
        let client = reqwest::Client::builder().cookie_store(true).build()?;
        let login_url = base_url.join("/login")?;
        let resp = client
            .post(login_url)
            .json(&serde_json::json!({"username": user, "password": pass}))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(anyhow!("login failed: HTTP {}", resp.status()));
        }
        let v: serde_json::Value = resp.json().await.unwrap_or(serde_json::json!({"status":"error"}));
        if v.get("status").and_then(|s| s.as_str()) != Some("ok") {
            return Err(anyhow!("login failed"));
        }
        Ok(Self { base: base_url, client })
    }

    async fn get(&self, path: &str) -> Result<serde_json::Value> {
        let url = self.base.join(path)?;
        let resp = self.client.get(url).send().await?;
        Self::decode(resp).await
    }

    async fn send(&self, method: reqwest::Method, path: &str, body: Option<serde_json::Value>) -> Result<serde_json::Value> {
        let url = self.base.join(path)?;
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        Self::decode(req.send().await?).await
    }

    async fn decode(resp: reqwest::Response) -> Result<serde_json::Value> {
        let status = resp.status();
        let v: serde_json::Value = resp.json().await.unwrap_or(serde_json::json!({}));
        if !status.is_success() {
            let msg = v.get("message").and_then(|m| m.as_str()).unwrap_or("request failed");
            return Err(anyhow!("HTTP {}: {}", status, msg));
        }
        Ok(v)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(|s| s.as_str()).unwrap_or("brickline_admin").to_string();

    let mut connect = "http://127.0.0.1:7878".to_string();
    let mut user: Option<String> = None;
    let mut password: Option<String> = None;
    let mut rest: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--connect" => {
                i += 1;
                connect = args.get(i).cloned().ok_or_else(|| anyhow!("--connect needs a URL"))?;
            }
            "--user" => {
                i += 1;
                user = Some(args.get(i).cloned().ok_or_else(|| anyhow!("--user needs a value"))?);
            }
            "--password" => {
                i += 1;
                password = Some(args.get(i).cloned().ok_or_else(|| anyhow!("--password needs a value"))?);
            }
            "-h" | "--help" => {
                print_usage(&program);
                return Ok(());
            }
            other => rest.push(other.to_string()),
        }
        i += 1;
    }

    if rest.is_empty() {
        print_usage(&program);
        return Err(anyhow!("no command given"));
    }
    let (Some(user), Some(password)) = (user, password) else {
        print_usage(&program);
        return Err(anyhow!("--user and --password are required"));
    };

    let session = HttpSession::connect(&connect, &user, &password).await?;

    let out = match rest[0].as_str() {
        "users" => session.get("/admin/api/users").await?,
        "promote" => {
            let user_id = rest.get(1).ok_or_else(|| anyhow!("promote needs <user_id> <role>"))?;
            let role = rest.get(2).ok_or_else(|| anyhow!("promote needs <user_id> <role>"))?;
            session
                .send(
                    reqwest::Method::PUT,
                    &format!("/admin/api/users/{user_id}/role"),
                    Some(serde_json::json!({"role": role})),
                )
                .await?
        }
        "verify" => {
            let user_id = rest.get(1).ok_or_else(|| anyhow!("verify needs <user_id> <true|false>"))?;
            let flag: bool = rest
                .get(2)
                .ok_or_else(|| anyhow!("verify needs <user_id> <true|false>"))?
                .parse()
                .context("verified flag must be true or false")?;
            session
                .send(
                    reqwest::Method::PUT,
                    &format!("/admin/api/users/{user_id}/verify"),
                    Some(serde_json::json!({"verified": flag})),
                )
                .await?
        }
        "approve" => {
            let id = rest.get(1).ok_or_else(|| anyhow!("approve needs <listing_id>"))?;
            session
                .send(reqwest::Method::POST, &format!("/admin/api/listings/{id}/approve"), None)
                .await?
        }
        "reject" => {
            let id = rest.get(1).ok_or_else(|| anyhow!("reject needs <listing_id>"))?;
            session
                .send(reqwest::Method::POST, &format!("/admin/api/listings/{id}/reject"), None)
                .await?
        }
        unknown => {
            print_usage(&program);
            return Err(anyhow!("unknown command: {unknown}"));
        }
    };

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
