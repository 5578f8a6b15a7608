//! Common test helpers

use crate::backend::drain_requests;
use crate::runner::TestContext;
use crate::types::ReceivedRequest;

/// Assert two strings are equal, with context on failure
pub fn assert_eq_str(actual: &str, expected: &str, label: &str) -> anyhow::Result<()> {
    if actual != expected {
        Err(anyhow::anyhow!("{label}: expected {:?} but got {:?}", expected, actual))
    } else {
        Ok(())
    }
}

/// Assert condition is true, with message
pub fn assert_true(cond: bool, msg: &str) -> anyhow::Result<()> {
    if !cond {
        Err(anyhow::anyhow!("{}", msg))
    } else {
        Ok(())
    }
}

/// Assert `seen` repeats with period `period` and the first period has no duplicates
pub fn assert_rotation(seen: &[String], period: usize) -> anyhow::Result<()> {
    let first: Vec<&String> = seen.iter().take(period).collect();
    for (i, name) in first.iter().enumerate() {
        assert_true(
            !first[..i].contains(name),
            &format!("Backend {} repeated within one rotation: {:?}", name, seen),
        )?;
    }
    for i in period..seen.len() {
        assert_true(
            seen[i] == seen[i - period],
            &format!("Rotation broke at request {}: {:?}", i, seen),
        )?;
    }
    Ok(())
}

/// Names of all backends, in configured order
pub async fn backend_names(ctx: &TestContext) -> Vec<String> {
    ctx.backends.lock().await.iter().map(|b| b.name.clone()).collect()
}

/// Drain every backend's request log, tagged with the backend name
pub async fn drain_all(ctx: &TestContext) -> Vec<(String, ReceivedRequest)> {
    let backends = ctx.backends.lock().await;
    backends
        .iter()
        .flat_map(|b| {
            drain_requests(&b.state)
                .into_iter()
                .map(|r| (b.name.clone(), r))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Stop the backend at `index`
pub async fn stop_backend(ctx: &TestContext, index: usize) -> anyhow::Result<String> {
    let mut backends = ctx.backends.lock().await;
    let backend = backends
        .get_mut(index)
        .ok_or_else(|| anyhow::anyhow!("No backend at index {}", index))?;
    backend.stop().await?;
    Ok(backend.name.clone())
}

/// Restart the backend at `index`
pub async fn restart_backend(ctx: &TestContext, index: usize) -> anyhow::Result<()> {
    let mut backends = ctx.backends.lock().await;
    let backend = backends
        .get_mut(index)
        .ok_or_else(|| anyhow::anyhow!("No backend at index {}", index))?;
    backend.restart().await
}
