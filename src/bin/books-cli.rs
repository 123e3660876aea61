use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "books-cli")]
#[command(about = "Command-line client for the Acme book API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Identity sent in the identity header.
    #[arg(short, long, env = "ACME_DN")]
    dn: Option<String>,

    /// Name of the identity header.
    #[arg(long, default_value = "x-dn")]
    header: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all books
    List,
    /// Show one book
    Get { id: i64 },
    /// Add a book
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        isbn: String,
        #[arg(long)]
        year: i32,
    },
    /// Replace a book's fields
    Update {
        id: i64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        isbn: String,
        #[arg(long)]
        year: i32,
    },
    /// Remove a book
    Delete { id: i64 },
    /// Check API health
    Health,
}

fn book_body(title: String, author: String, isbn: String, year: i32) -> Value {
    json!({
        "title": title,
        "author": author,
        "isbn": isbn,
        "publicationYear": year,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(dn) = &cli.dn {
        headers.insert(
            HeaderName::from_bytes(cli.header.as_bytes())?,
            HeaderValue::from_str(dn)?,
        );
    }

    let books = format!("{}/api/books", cli.url.trim_end_matches('/'));

    let res = match cli.command {
        Commands::List => client.get(&books).headers(headers).send().await?,
        Commands::Get { id } => {
            client
                .get(format!("{}/{}", books, id))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Create { title, author, isbn, year } => {
            client
                .post(&books)
                .headers(headers)
                .json(&book_body(title, author, isbn, year))
                .send()
                .await?
        }
        Commands::Update { id, title, author, isbn, year } => {
            client
                .put(format!("{}/{}", books, id))
                .headers(headers)
                .json(&book_body(title, author, isbn, year))
                .send()
                .await?
        }
        Commands::Delete { id } => {
            client
                .delete(format!("{}/{}", books, id))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Health => {
            client
                .get(format!("{}/actuator/health", cli.url.trim_end_matches('/')))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
    }
    if text.is_empty() {
        println!("{}", status);
        return Ok(());
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
