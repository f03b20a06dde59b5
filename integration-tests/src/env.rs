// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Environment variables that would make the output of venom-explorer depend on the machine
/// running the tests.
const CLEARED_VARS: &[&str] = &[
    "VENOM_EXPLORER_LOG",
    "VENOM_EXPLORER_VERBOSE",
    "VENOM_BINARY",
    "FAKE_VENOM_VERSION",
];

/// Returns the environment every test starts from: colors off and no inherited overrides.
pub fn base_env() -> Vec<(&'static str, Option<String>)> {
    let mut env: Vec<_> = CLEARED_VARS.iter().map(|&var| (var, None)).collect();
    env.push(("VENOM_EXPLORER_COLOR", Some("never".to_owned())));
    env
}
