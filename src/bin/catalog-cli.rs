use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "catalog-cli")]
#[command(about = "Management CLI for the course catalog service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service health
    Health,
    /// List all courses
    List,
    /// Show one course
    Show { id: String },
    /// Add a course
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        code: String,
        #[arg(long)]
        credits: String,
        #[arg(long)]
        instructor: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a course
    Delete { id: String },
    /// Show request and error counters
    Metrics,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
        Commands::List => client.get(format!("{}/courses", base)).send().await?,
        Commands::Show { id } => client.get(format!("{}/courses/{}", base, id)).send().await?,
        Commands::Add {
            name,
            code,
            credits,
            instructor,
            description,
        } => {
            let body = json!({
                "name": name,
                "code": code,
                "credits": credits,
                "instructor": instructor,
                "description": description,
            });
            client.post(format!("{}/courses", base)).json(&body).send().await?
        }
        Commands::Delete { id } => client.delete(format!("{}/courses/{}", base, id)).send().await?,
        Commands::Metrics => client.get(format!("{}/metrics/snapshot", base)).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let json: Value = res.json().await.unwrap_or(Value::Null);
    check_status(status, &json)?;

    if let Some(warning) = json.get("warning").and_then(|w| w.get("message")).and_then(Value::as_str) {
        eprintln!("Warning: {}", warning);
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

/// Turn a non-2xx response into an error carrying the server's message.
fn check_status(status: reqwest::StatusCode, json: &Value) -> Result<(), String> {
    if status.is_success() {
        return Ok(());
    }
    match json.get("message").and_then(Value::as_str) {
        Some(message) => Err(format!("catalog returned status {}: {}", status, message)),
        None => Err(format!("catalog returned status {}", status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::json;

    #[test]
    fn test_check_status() {
        assert!(check_status(StatusCode::CREATED, &json!({})).is_ok());

        let err = check_status(StatusCode::NOT_FOUND, &json!({"message": "No course found"})).unwrap_err();
        assert_eq!(err, "catalog returned status 404 Not Found: No course found");

        let err = check_status(StatusCode::INTERNAL_SERVER_ERROR, &Value::Null).unwrap_err();
        assert_eq!(err, "catalog returned status 500 Internal Server Error");
    }
}
