#![deny(clippy::unwrap_used)]

use savings_planner::SavingsPlanner;

fn main() {
    let canister_e_idl = SavingsPlanner::idl();
    let idl = candid::pretty::candid::compile(&canister_e_idl.env.env, &Some(canister_e_idl.actor));

    println!("{}", idl);
}
