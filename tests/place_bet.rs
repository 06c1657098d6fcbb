#![allow(non_snake_case)]
use crate::type_amount;
use dapps_game::{
    Action,
    ActionError,
    advisory::{
        Advisory,
        Severity,
    },
    config::{
        BetUnits,
        ClientConfig,
    },
    forms::InputField,
    provider::ContractCall,
    simulated::{
        SimulatedChainConfig,
        dev_account,
    },
    stats::MachineSlot,
    test_helpers::TestContext,
    units,
};

fn slot(index: usize) -> MachineSlot {
    MachineSlot::new(index).unwrap()
}

#[tokio::test]
async fn place_bet__approves_and_seats_player() {
    // given
    let ctx = TestContext::new();
    ctx.give_tokens(ctx.alice(), 500);
    let mut controller = ctx.connected_controller().await;
    controller.select_machine(slot(1));
    type_amount(&mut controller, InputField::BetAmount, "200");

    // when
    controller.perform(Action::PlaceBet).await.unwrap();

    // then
    let calls: Vec<ContractCall> = ctx
        .chain()
        .submitted_transactions()
        .into_iter()
        .map(|tx| tx.call)
        .collect();
    assert_eq!(
        vec![
            ContractCall::Approve {
                spender: ctx.chain().game_address(),
                amount: units::tokens(200),
            },
            ContractCall::PlaceBet {
                machine: 1,
                amount: units::tokens(200),
            },
        ],
        calls
    );
    assert_eq!(units::tokens(300), controller.balance().raw);
    assert_eq!(2, controller.current_machine());
    let machines = controller.machines();
    assert!(machines[0].occupied_elsewhere);
    assert!(!machines[1].occupied_elsewhere);
    assert!(machines[2].occupied_elsewhere);
    assert_eq!(1, machines[1].player_count);
    assert_eq!(
        Some(&Advisory::success("Bet placed successfully! Check if you won!")),
        controller.advisory()
    );
    assert_eq!("", controller.inputs().bet_amount);
}

#[tokio::test]
async fn place_bet__rejects_a_second_machine_before_submitting() {
    // given
    let ctx = TestContext::new();
    ctx.seat_player(ctx.alice(), 1, 10).await;
    ctx.give_tokens(ctx.alice(), 100);
    let mut controller = ctx.connected_controller().await;
    let submitted = ctx.chain().submitted_transactions().len();
    controller.select_machine(slot(0));
    type_amount(&mut controller, InputField::BetAmount, "5");

    // when
    let result = controller.perform(Action::PlaceBet).await;

    // then
    assert!(matches!(
        result,
        Err(ActionError::AlreadySeated { machine: 2 })
    ));
    assert_eq!(
        Some(&Advisory::warning("You are already playing on Machine 2!")),
        controller.advisory()
    );
    assert_eq!(submitted, ctx.chain().submitted_transactions().len());
    assert_eq!("5", controller.inputs().bet_amount);
}

#[tokio::test]
async fn place_bet__allows_more_bets_on_the_same_machine() {
    // given
    let ctx = TestContext::new();
    ctx.seat_player(ctx.alice(), 2, 10).await;
    ctx.give_tokens(ctx.alice(), 100);
    let mut controller = ctx.connected_controller().await;
    controller.select_machine(slot(2));
    type_amount(&mut controller, InputField::BetAmount, "40");

    // when
    controller.perform(Action::PlaceBet).await.unwrap();

    // then
    assert_eq!(units::tokens(60), controller.balance().raw);
    assert_eq!(3, controller.current_machine());
    assert_eq!(1, ctx.chain().player_count(2));
    assert_eq!(units::tokens(50), ctx.chain().pot(2));
}

#[tokio::test]
async fn place_bet__rejects_bets_above_the_limit() {
    // given
    let ctx = TestContext::new();
    ctx.give_tokens(ctx.alice(), 20_000);
    let mut controller = ctx.connected_controller().await;
    type_amount(&mut controller, InputField::BetAmount, "10001");

    // when
    let result = controller.perform(Action::PlaceBet).await;

    // then
    assert!(matches!(
        result,
        Err(ActionError::BetTooLarge { max: 10_000 })
    ));
    assert!(ctx.chain().submitted_transactions().is_empty());
    assert!(!controller.build_snapshot().bet_submittable);
}

#[tokio::test]
async fn place_bet__reports_insufficient_balance() {
    // given
    let ctx = TestContext::new();
    ctx.give_tokens(ctx.alice(), 50);
    let mut controller = ctx.connected_controller().await;
    type_amount(&mut controller, InputField::BetAmount, "60");

    // when
    let result = controller.perform(Action::PlaceBet).await;

    // then
    assert!(matches!(
        result,
        Err(ActionError::InsufficientBalance { .. })
    ));
    assert_eq!(
        Some(&Advisory::danger(
            "Insufficient token balance. You have 50.0 DGT but tried to bet 60.0 DGT."
        )),
        controller.advisory()
    );
    assert!(ctx.chain().submitted_transactions().is_empty());
}

#[tokio::test]
async fn place_bet__rejects_zero() {
    // given
    let ctx = TestContext::new();
    ctx.give_tokens(ctx.alice(), 50);
    let mut controller = ctx.connected_controller().await;
    type_amount(&mut controller, InputField::BetAmount, "0");

    // when
    let result = controller.perform(Action::PlaceBet).await;

    // then
    assert!(matches!(result, Err(ActionError::AmountNotPositive)));
    assert_eq!(
        Severity::Danger,
        controller.advisory().unwrap().severity
    );
}

#[tokio::test]
async fn place_bet__winning_bet_pays_target_and_frees_machine() {
    // given
    let ctx = TestContext::with_targets([300, 5_000, 5_000]);
    ctx.seat_player(ctx.bob(), 0, 200).await;
    ctx.give_tokens(ctx.alice(), 500);
    let mut controller = ctx.connected_controller().await;
    assert_eq!(1, controller.machines()[0].player_count);
    controller.select_machine(slot(0));
    type_amount(&mut controller, InputField::BetAmount, "100");

    // when
    controller.perform(Action::PlaceBet).await.unwrap();

    // then
    assert_eq!(units::tokens(700), controller.balance().raw);
    assert_eq!(0, controller.current_machine());
    assert_eq!(0, controller.machines()[0].player_count);
    assert!(controller.machines().iter().all(|m| !m.occupied_elsewhere));
    assert_eq!(0, ctx.chain().seat(ctx.bob()));
    assert_eq!(Severity::Success, controller.advisory().unwrap().severity);
}

#[tokio::test]
async fn place_bet__raw_units_pass_whole_tokens() {
    // given
    let ctx = TestContext::with_chain_config(SimulatedChainConfig {
        bet_units: BetUnits::Raw,
        targets: Some([5_000, 5_000, 5_000]),
        ..SimulatedChainConfig::default()
    });
    ctx.give_tokens(ctx.alice(), 100);
    let mut controller = ctx.controller_with(ClientConfig {
        bet_units: BetUnits::Raw,
        ..ctx.client_config()
    });
    controller.init().await;
    controller.perform(Action::Connect).await.unwrap();
    type_amount(&mut controller, InputField::BetAmount, "25");

    // when
    controller.perform(Action::PlaceBet).await.unwrap();

    // then
    let calls: Vec<ContractCall> = ctx
        .chain()
        .submitted_transactions()
        .into_iter()
        .map(|tx| tx.call)
        .collect();
    assert_eq!(
        vec![
            ContractCall::Approve {
                spender: ctx.chain().game_address(),
                amount: units::tokens(25),
            },
            ContractCall::PlaceBet {
                machine: 0,
                amount: 25u64.into(),
            },
        ],
        calls
    );
    assert_eq!(units::tokens(75), controller.balance().raw);
}

#[tokio::test]
async fn place_bet__raw_units_reject_fractional_amounts() {
    // given
    let ctx = TestContext::new();
    ctx.give_tokens(ctx.alice(), 100);
    let mut controller = ctx.controller_with(ClientConfig {
        bet_units: BetUnits::Raw,
        ..ctx.client_config()
    });
    controller.init().await;
    controller.perform(Action::Connect).await.unwrap();
    type_amount(&mut controller, InputField::BetAmount, "2.5");

    // when
    let result = controller.perform(Action::PlaceBet).await;

    // then
    assert!(matches!(result, Err(ActionError::FractionalRawBet)));
    assert!(ctx.chain().submitted_transactions().is_empty());
}

#[tokio::test]
async fn place_bet__full_machine_reverts() {
    // given
    let ctx = TestContext::new();
    for index in 10..20 {
        ctx.seat_player(dev_account(index), 0, 1).await;
    }
    ctx.give_tokens(ctx.alice(), 100);
    let mut controller = ctx.connected_controller().await;
    assert!(controller.machines()[0].is_full());
    type_amount(&mut controller, InputField::BetAmount, "5");

    // when
    let result = controller.perform(Action::PlaceBet).await;

    // then
    assert!(result.is_err());
    assert_eq!(
        Some(&Advisory::danger(
            "Error placing bet: placeBet reverted: Machine is full"
        )),
        controller.advisory()
    );
    assert_eq!(0, ctx.chain().seat(ctx.alice()));
    assert_eq!(units::tokens(100), ctx.token_balance(ctx.alice()));
}
