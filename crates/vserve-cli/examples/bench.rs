use std::time::Instant;

#[tokio::main]
async fn main() {
    let n: usize = std::env::var("N").ok().and_then(|v| v.parse().ok()).unwrap_or(16);
    let batch: usize = std::env::var("BATCH").ok().and_then(|v| v.parse().ok()).unwrap_or(1);
    let prompt = std::env::var("PROMPT").unwrap_or_else(|_| "Hello".into());
    let url = std::env::var("URL").unwrap_or_else(|_| "http://127.0.0.1:8080/completion/".into());
    let client = reqwest::Client::new();
    let start = Instant::now();
    let mut tasks = Vec::new();
    for _ in 0..n {
        let c = client.clone();
        let body = if batch > 1 {
            serde_json::json!({"prompt": vec![prompt.clone(); batch]})
        } else {
            serde_json::json!({"prompt": prompt.clone()})
        };
        let u = url.clone();
        tasks.push(tokio::spawn(async move {
            c.post(&u).json(&body).send().await.map(|r| r.status().is_success()).unwrap_or(false)
        }));
    }
    let mut ok = 0;
    for t in tasks {
        if let Ok(true) = t.await { ok += 1; }
    }
    println!("{}/{} requests ({} prompts each) succeeded in {:.2}s", ok, n, batch, start.elapsed().as_secs_f32());
}
