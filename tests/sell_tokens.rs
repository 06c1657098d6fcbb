#![allow(non_snake_case)]
use crate::type_amount;
use dapps_game::{
    Action,
    U256,
    advisory::Advisory,
    config::{
        ApprovalPolicy,
        ClientConfig,
    },
    forms::InputField,
    provider::ContractCall,
    test_helpers::TestContext,
    units,
};

#[tokio::test]
async fn sell_tokens__approves_then_sells_for_eth() {
    // given
    let ctx = TestContext::new();
    ctx.give_tokens(ctx.alice(), 1_000);
    let mut controller = ctx.connected_controller().await;
    let eth_before = ctx.chain().eth_balance(ctx.alice());
    type_amount(&mut controller, InputField::SellAmount, "200");

    // when
    controller.perform(Action::SellTokens).await.unwrap();

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
            ContractCall::SellTokens {
                amount: units::tokens(200),
            },
        ],
        calls
    );
    assert_eq!(units::tokens(800), controller.balance().raw);
    assert_eq!(
        eth_before + units::parse_ether("0.002").unwrap(),
        ctx.chain().eth_balance(ctx.alice())
    );
    assert_eq!(
        Some(&Advisory::success("Tokens sold successfully!")),
        controller.advisory()
    );
    assert_eq!("", controller.inputs().sell_amount);
}

#[tokio::test]
async fn sell_tokens__fixed_policy_leaves_standing_allowance() {
    // given
    let ctx = TestContext::new();
    ctx.give_tokens(ctx.alice(), 1_000);
    let mut controller = ctx.controller_with(ClientConfig {
        approval: ApprovalPolicy::Fixed { tokens: 1_000_000 },
        ..ctx.client_config()
    });
    controller.init().await;
    controller.perform(Action::Connect).await.unwrap();
    type_amount(&mut controller, InputField::SellAmount, "200");

    // when
    controller.perform(Action::SellTokens).await.unwrap();

    // then
    assert_eq!(
        units::tokens(1_000_000) - units::tokens(200),
        ctx.chain().allowance(ctx.alice(), ctx.chain().game_address())
    );
    assert_eq!(units::tokens(800), ctx.token_balance(ctx.alice()));
}

#[tokio::test]
async fn sell_tokens__rejected_approval_stops_before_selling() {
    // given
    let ctx = TestContext::new();
    ctx.give_tokens(ctx.alice(), 1_000);
    let mut controller = ctx.connected_controller().await;
    type_amount(&mut controller, InputField::SellAmount, "200");
    ctx.chain().fail_next("approve", "denied");

    // when
    let result = controller.perform(Action::SellTokens).await;

    // then
    assert!(result.is_err());
    assert!(ctx.chain().submitted_transactions().is_empty());
    assert_eq!(
        Some(&Advisory::danger(
            "Error selling tokens: approve reverted: denied"
        )),
        controller.advisory()
    );
    assert_eq!("200", controller.inputs().sell_amount);
    assert_eq!(units::tokens(1_000), ctx.token_balance(ctx.alice()));
}

#[tokio::test]
async fn sell_tokens__failed_sale_keeps_the_approval() {
    // given
    let ctx = TestContext::new();
    ctx.give_tokens(ctx.alice(), 100);
    let mut controller = ctx.connected_controller().await;
    type_amount(&mut controller, InputField::SellAmount, "150");

    // when
    let result = controller.perform(Action::SellTokens).await;

    // then
    assert!(result.is_err());
    assert_eq!(
        Some(&Advisory::danger(
            "Error selling tokens: sellTokens reverted: ERC20: transfer amount exceeds balance"
        )),
        controller.advisory()
    );
    assert_eq!(
        units::tokens(150),
        ctx.chain().allowance(ctx.alice(), ctx.chain().game_address())
    );
    assert_eq!(1, ctx.chain().submitted_transactions().len());
    assert_eq!(units::tokens(100), controller.balance().raw);
    assert!(controller.pending().is_none());
}

#[tokio::test]
async fn sell_tokens__previews_eth_received() {
    // given
    let ctx = TestContext::new();
    let mut controller = ctx.controller();
    type_amount(&mut controller, InputField::SellAmount, "250000");

    // when
    let snapshot = controller.build_snapshot();

    // then
    assert_eq!("2.5", snapshot.sell_preview);
    assert_eq!(U256::ZERO, snapshot.balance.raw);
}
