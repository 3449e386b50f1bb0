//! A small command-line client for the portal API.
//!
//! ```text
//! portal-cli whoami          show the restored session
//! portal-cli login           sign in with WARDEN_EMAIL / WARDEN_PASSWORD
//! portal-cli get <path>      GET a protected resource and print the JSON
//! portal-cli logout          sign out and forget the stored session
//! ```
//!
//! Environment:
//! - `WARDEN_API_URL` (default `http://127.0.0.1:3000`)
//! - `WARDEN_STORE_PATH` (default `.warden/session.json`)
//! - `WARDEN_EMAIL`, `WARDEN_PASSWORD` for `login`
//! - `RUST_LOG` for log verbosity

use std::env;
use std::sync::Arc;

use warden::prelude::*;

const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_STORE_PATH: &str = ".warden/session.json";

fn usage() -> ! {
    eprintln!("usage: portal-cli <whoami | login | get <path> | logout>");
    std::process::exit(2);
}

fn print_user(user: &UserProfile) {
    println!("{} <{}> ({})", user.display_name(), user.email, user.role);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    warden::telemetry::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        usage();
    };

    let api_url = env::var("WARDEN_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    let store_path =
        env::var("WARDEN_STORE_PATH").unwrap_or_else(|_| DEFAULT_STORE_PATH.to_string());
    tracing::info!(api_url, store_path, "starting portal-cli");

    let client = ClientBuilder::new()
        .base_url(&api_url)
        .store(FileStore::open(&store_path)?)
        .navigator(Arc::new(|message: &str, is_error: bool| {
            if is_error {
                eprintln!("error: {message}");
            } else {
                eprintln!("{message}");
            }
        }))
        .build()?;
    client.bootstrap().await;

    match command {
        "whoami" => match client.session().current_user() {
            Some(user) => print_user(&user),
            None => println!("not signed in"),
        },
        "login" => {
            let email = env::var("WARDEN_EMAIL")?;
            let password = env::var("WARDEN_PASSWORD")?;
            let user = client.session().login(&email, &password).await?;
            print_user(&user);
        }
        "get" => {
            let Some(path) = args.get(1) else {
                usage();
            };
            let body: serde_json::Value = client.get_json(path).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        "logout" => client.session().logout().await,
        _ => usage(),
    }

    client.shutdown();
    Ok(())
}
