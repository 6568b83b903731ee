use std::io::Write;

use scripture_stream::{
    HealthStatus, SearchResponse, SourceCollection, SourceRecord, StreamEvent, StreamSession,
};

const EXCERPT_CHARS: usize = 160;

pub fn json_event(out: &mut impl Write, event: &StreamEvent) {
    if let Ok(line) = serde_json::to_string(event) {
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}

pub fn session_summary(session: &StreamSession) {
    if !session.sources().is_empty() {
        println!("\nSources:");
        for source in session.sources() {
            println!("{}", source_line(source));
        }
    }
    if let Some(secs) = session.search_time_seconds() {
        println!("\nsearch took {secs:.2}s");
    }
}

pub fn search_results(response: &SearchResponse) {
    if response.results.is_empty() {
        println!("no results");
        return;
    }
    for source in &response.results {
        println!("{}", source_line(source));
        println!("    {}", excerpt(&source.content));
    }
    if let Some(ms) = response.search_time_ms {
        println!("\n{} results in {:.2}s", response.results.len(), ms / 1000.0);
    }
}

pub fn health(health: &HealthStatus) {
    let mut line = format!("status: {}", health.status);
    if let Some(version) = &health.version {
        line.push_str(&format!(", version {version}"));
    }
    if let Some(size) = health.index_size {
        line.push_str(&format!(", {size} indexed passages"));
    }
    println!("{line}");
}

pub fn collections(sources: &[SourceCollection]) {
    for source in sources {
        match source.document_count {
            Some(count) => println!("{:<32} {:?} ({count} documents)", source.name, source.source_type),
            None => println!("{:<32} {:?}", source.name, source.source_type),
        }
    }
}

fn source_line(source: &SourceRecord) -> String {
    let mut line = format!(
        "{:>3}. {} [{:.2}]",
        source.rank,
        source.display_citation(),
        source.score
    );
    if let Some(url) = &source.url {
        line.push_str(&format!(" {url}"));
    }
    line
}

fn excerpt(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= EXCERPT_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(EXCERPT_CHARS).collect();
    format!("{}…", cut.trim_end())
}
