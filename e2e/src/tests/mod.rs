//! Test registry - all test cases are registered here

pub mod helpers;

use crate::runner::TestCase;

/// Build and return all test cases
///
/// Tests are grouped by category. Each test:
/// 1. Starts from all mock backends running with empty request logs
/// 2. Sends requests to the REAL balancer (stopping backends where needed)
/// 3. Validates what the client got and what the backends received
pub fn all_tests() -> Vec<TestCase> {
    macro_rules! test {
        ($name:expr, $desc:expr, $func:path) => {
            TestCase {
                name: $name,
                description: $desc,
                run: Box::new(|ctx| Box::pin($func(ctx))),
            }
        };
    }

    vec![
        // ── Rotation ──────────────────────────────────────────────────────────
        test!(
            "basic/round_robin_rotation",
            "Consecutive requests visit every backend once before repeating",
            basic::test_round_robin_rotation
        ),
        test!(
            "basic/even_distribution",
            "Requests are spread evenly when every backend is alive",
            basic::test_even_distribution
        ),
        test!(
            "basic/backend_error_passthrough",
            "Backend error statuses (5xx) are forwarded to the client",
            basic::test_backend_error_passthrough
        ),

        // ── Pass-through ──────────────────────────────────────────────────────
        test!(
            "passthrough/method_path_body",
            "Method, path, query and body reach the backend unchanged",
            passthrough::test_method_path_body
        ),
        test!(
            "passthrough/headers",
            "Client headers are kept, Host names the backend, X-Forwarded-For is added",
            passthrough::test_headers
        ),
        test!(
            "passthrough/status_code",
            "Non-2xx backend status codes reach the client unchanged",
            passthrough::test_status_code
        ),

        // ── Health checks ─────────────────────────────────────────────────────
        test!(
            "health/dead_backend_skipped",
            "A stopped backend is skipped once the health check marks it dead",
            health::test_dead_backend_skipped
        ),
        test!(
            "health/all_dead_503",
            "With every backend stopped the balancer answers 503 No servers available",
            health::test_all_dead_503
        ),
        test!(
            "health/recovery",
            "A restarted backend rejoins the rotation after the next probe",
            health::test_recovery
        ),
    ]
}
