// SPDX-License-Identifier: Apache-2.0

//! Background loops spawned at startup. Plain `tokio::time::interval` ticks;
//! the first tick fires immediately so a restart catches up right away.

pub mod auto_assign;
pub mod cleanup;

use tokio::task::JoinHandle;

use crate::AppState;

pub fn spawn_all(state: &AppState) -> Vec<JoinHandle<()>> {
    vec![auto_assign::spawn(state.clone()), cleanup::spawn(state.clone())]
}
