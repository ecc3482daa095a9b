use kanshi::{Change, ObserveOptions, Result, Session, Target, TrackedValue, Value};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let session = Session::new();
    let config = Target::from_iter([
        ("name", Value::from("worker-1")),
        (
            "limits",
            Value::record([("retries", 3), ("backoff_ms", 250)]),
        ),
        ("tags", Value::set(["critical"])),
    ]);

    session.observe_with(
        &config,
        ["name", "limits", "tags"],
        |change: &Change| {
            println!(
                "[{}] {:?} -> {:?} ({:?})",
                change.path, change.old, change.new, change.origin
            );
        },
        ObserveOptions::default().with_poll_deletions(false),
    )?;

    // Direct reassignment fires the observer with old and new values
    config.set("name", "worker-2")?;

    // Sub-key writes and method calls on object values are trapped too
    if let TrackedValue::Object(limits) = config.get("limits")? {
        limits.set("retries", 5)?;
        limits.invoke("insert", &[Value::from("timeout_ms"), Value::Int(1000)])?;
    }
    if let TrackedValue::Object(tags) = config.get("tags")? {
        tags.invoke("insert", &[Value::from("beta")])?;
    }

    session.unobserve_all(&config)?;
    Ok(())
}
