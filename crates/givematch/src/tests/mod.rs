use libgivematch::prelude::*;

use crate::api::{AppState, config::Config};

mod middlewares;

pub(crate) fn store() -> MockStore {
  store_with(vec![])
}

pub(crate) fn store_with(parameters: Vec<ParameterSnapshot>) -> MockStore {
  MockStore::builder()
    .donations(vec![
      Donation::builder("food")
        .id("rice")
        .donor_id("dana")
        .title("Bags of rice")
        .quantity(10.0)
        .location(Location::city("Lyon"))
        .build(),
    ])
    .requests(vec![
      Request::builder("food").id("family").recipient_id("ryan").title("rice").quantity_needed(10.0).location(Location::city("Lyon")).build(),
      Request::builder("clothing").id("coats").recipient_id("rosa").location(Location::city("Marseille")).build(),
    ])
    .tasks(vec![Task::builder().id("pickup").location(Location::city("Lyon")).build()])
    .volunteers(vec![Volunteer::builder().id("vera").user_id("vera").location(Location::city("Lyon")).build()])
    .parameters(parameters)
    .build()
}

pub(crate) fn state(config: Config, store: MockStore) -> AppState<MockStore> {
  AppState {
    config,
    prometheus: None,
    givematch: Givematch::new(store).build(),
  }
}
