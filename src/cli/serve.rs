//! Web server command.

use console::style;

use crate::config::Settings;
use crate::parser::DocumentParser;

/// Port used when a bind address names only a host.
const DEFAULT_PORT: u16 = 8000;

/// Start the web server.
pub async fn cmd_serve(
    settings: &Settings,
    parser: DocumentParser,
    bind: &str,
) -> anyhow::Result<()> {
    let (host, port) = parse_bind_address(bind)?;

    settings.ensure_directories()?;
    println!(
        "{} Storing uploads in {}",
        style("→").cyan(),
        settings.documents_dir.display()
    );
    if settings.llm.enabled {
        println!(
            "  {} LLM refinement via {}",
            style("✓").green(),
            settings.llm.provider
        );
    } else {
        println!("  {} LLM refinement disabled", style("○").dim());
    }

    println!(
        "{} Starting uniparse server at http://{}:{}",
        style("→").cyan(),
        host,
        port
    );
    println!("  Press Ctrl+C to stop");

    crate::server::serve(settings, parser, &host, port).await
}

/// Parse a bind address that can be:
/// - Just a port: "8080" -> 127.0.0.1:8080
/// - Just a host: "0.0.0.0" -> 0.0.0.0:8000
/// - Host and port: "0.0.0.0:8080" -> 0.0.0.0:8080
pub fn parse_bind_address(bind: &str) -> anyhow::Result<(String, u16)> {
    let bind = bind.trim();
    if bind.is_empty() {
        anyhow::bail!("Bind address is empty");
    }

    if let Ok(port) = bind.parse::<u16>() {
        return Ok(("127.0.0.1".to_string(), port));
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return Ok((host.to_string(), port));
        }
    }

    Ok((bind.to_string(), DEFAULT_PORT))
}
