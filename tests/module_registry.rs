mod common;

use common::{TestContext, bundle};
use predicates::prelude::*;

#[test]
fn latest_resolves_the_highest_matching_version() {
    let ctx = TestContext::new();
    let mut server = mockito::Server::new();
    let list = server
        .mock("GET", "/example.com/prompts/@v/list")
        .with_status(200)
        .with_body("v0.0.1\nv0.0.2\nv0.1.0\nv1.0.0\n")
        .create();

    ctx.cli()
        .env("KICKOFF_REGISTRY", server.url())
        .args(["module", "latest", "example.com/prompts@v0"])
        .assert()
        .success()
        .stdout(predicate::str::diff("example.com/prompts@v0.1.0\n"));

    list.assert();
}

#[test]
fn concrete_reference_is_returned_without_listing() {
    let ctx = TestContext::new();
    let mut server = mockito::Server::new();
    let list = server.mock("GET", "/example.com/prompts/@v/list").expect(0).create();

    ctx.cli()
        .env("KICKOFF_REGISTRY", server.url())
        .args(["module", "latest", "example.com/prompts@v0.0.1"])
        .assert()
        .success()
        .stdout(predicate::str::diff("example.com/prompts@v0.0.1\n"));

    list.assert();
}

#[test]
fn unknown_module_reports_no_versions() {
    let ctx = TestContext::new();
    let mut server = mockito::Server::new();
    server.mock("GET", "/example.com/missing/@v/list").with_status(404).create();

    ctx.cli()
        .env("KICKOFF_REGISTRY", server.url())
        .args(["module", "latest", "example.com/missing@v1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No versions found for example.com/missing@v1"));
}

#[test]
fn imported_bundle_is_fetched_once_then_served_from_cache() {
    let ctx = TestContext::new();
    let mut server = mockito::Server::new();
    let archive = bundle(&[
        ("kickoff.toml", "[tasks.shared]\nfile = \"prompts/shared.md\"\n"),
        ("prompts/shared.md", "Shared team prompt"),
    ]);
    let list = server
        .mock("GET", "/example.com/team/@v/list")
        .with_body("v1.0.0\nv1.2.0\n")
        .expect(1)
        .create();
    let download = server
        .mock("GET", "/example.com/team/@v/v1.2.0.tar.gz")
        .with_body(archive)
        .expect(1)
        .create();
    ctx.write_local("kickoff.toml", "[settings]\nimports = [\"example.com/team@v1\"]\n");

    for _ in 0..2 {
        ctx.cli()
            .env("KICKOFF_REGISTRY", server.url())
            .args(["--dry-run", "task", "shared"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Shared team prompt"));
    }

    list.assert();
    download.assert();
    assert!(ctx.cache_dir().join("example.com/team@v1.2.0/.complete").is_file());
}

/// Nothing listens on the discard port; every request fails to connect.
const UNREACHABLE: &str = "http://127.0.0.1:9";

fn cache_team_bundle(ctx: &TestContext) {
    let mut server = mockito::Server::new();
    server.mock("GET", "/example.com/team/@v/list").with_body("v1.0.0\n").create();
    server
        .mock("GET", "/example.com/team/@v/v1.0.0.tar.gz")
        .with_body(bundle(&[("kickoff.toml", "[tasks.shared]\nprompt = \"cached\"\n")]))
        .create();

    ctx.cli()
        .env("KICKOFF_REGISTRY", server.url())
        .args(["module", "fetch", "example.com/team@v1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("example.com/team@v1.0.0"));
}

#[test]
fn cached_imports_work_offline() {
    let ctx = TestContext::new();
    cache_team_bundle(&ctx);
    ctx.write_local("kickoff.toml", "[settings]\nimports = [\"example.com/team@v1\"]\n");

    ctx.cli()
        .env("KICKOFF_REGISTRY", UNREACHABLE)
        .args(["--dry-run", "task", "shared"])
        .assert()
        .success()
        .stdout(predicate::str::diff("cached\n"))
        .stderr(predicate::str::contains("retrying").not());
}

#[test]
fn refresh_falls_back_to_the_cache_when_the_registry_is_unreachable() {
    let ctx = TestContext::new();
    cache_team_bundle(&ctx);
    ctx.write_local("kickoff.toml", "[settings]\nimports = [\"example.com/team@v1\"]\n");

    ctx.cli()
        .env("KICKOFF_REGISTRY", UNREACHABLE)
        .args(["--dry-run", "--refresh", "task", "shared"])
        .assert()
        .success()
        .stdout(predicate::str::diff("cached\n"))
        .stderr(predicate::str::contains("using cached bundle"));
}

#[test]
fn unreachable_registry_without_cache_is_fatal() {
    let ctx = TestContext::new();
    ctx.write_local("kickoff.toml", "[settings]\nimports = [\"example.com/team@v1\"]\n");

    ctx.cli()
        .env("KICKOFF_REGISTRY", UNREACHABLE)
        .args(["--dry-run", "task", "shared"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Registry request to"));
}
