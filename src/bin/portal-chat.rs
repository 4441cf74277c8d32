use std::path::PathBuf;

use chat_portal::{
    client::{
        ChatSession, DownloadWriter, HttpRelay, SendState, SubmitRejection, read_attachments,
    },
    config::AppConfig,
    models::{Message, Role},
    util::init_tracing,
};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "commands: /attach <path>...  /files  /drop <n>  /clear  /quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing("warn");

    let config = AppConfig::load()?;
    let relay = HttpRelay::new(config.client.relay_url.clone())?;
    let downloads = DownloadWriter::new(config.client.download_dir.clone()).await?;

    println!("chat portal -> {}", relay.url());
    println!("{HELP}");

    let mut session = ChatSession::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end();

        if let Some(rest) = line.strip_prefix('/') {
            let mut parts = rest.split_whitespace();
            match parts.next().unwrap_or_default() {
                "quit" | "exit" => break,
                "clear" => {
                    session = session.clear();
                    println!("(history cleared)");
                }
                "files" => {
                    for (index, file) in session.pending_attachments().iter().enumerate() {
                        println!("  [{index}] {} ({}, {} bytes)", file.name, file.mime_type, file.size);
                    }
                }
                "drop" => match parts.next().and_then(|n| n.parse::<usize>().ok()) {
                    Some(index) => session = session.remove_attachment(index),
                    None => println!("usage: /drop <n>"),
                },
                "attach" => {
                    let paths: Vec<PathBuf> = parts.map(PathBuf::from).collect();
                    if paths.is_empty() {
                        println!("usage: /attach <path>...");
                        continue;
                    }
                    match read_attachments(&paths).await {
                        Ok(batch) => {
                            println!("(attached {} file(s))", batch.len());
                            session = session.attach(batch);
                        }
                        Err(err) => println!("could not read attachments: {err}"),
                    }
                }
                _ => println!("{HELP}"),
            }
            continue;
        }

        let (next, rejected) = session.with_input(line).send(&relay).await;
        session = next;

        match rejected {
            Some(SubmitRejection::Empty) => continue,
            Some(SubmitRejection::InFlight) => {
                println!("(still waiting for the previous reply)");
                continue;
            }
            None => {}
        }

        if let Some(reply) = session.history().last() {
            render_reply(reply, &downloads).await;
        }
        if session.state() == SendState::ErrorDisplayed {
            session = session.dismiss_error();
        }
    }

    Ok(())
}

async fn render_reply(reply: &Message, downloads: &DownloadWriter) {
    debug_assert_eq!(reply.role, Role::Assistant);

    println!("\n{}\n", reply.content);

    for artifact in &reply.artifacts {
        println!("--- {} [{}] ---", artifact.title, artifact.language);
        println!("{}", artifact.content);
        println!("---");
    }

    for file in &reply.files {
        match downloads.save(file).await {
            Ok(path) => println!("saved {} -> {}", file.name, path.display()),
            Err(err) => println!("could not save {}: {err}", file.name),
        }
    }
}
