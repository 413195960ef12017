use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::candidate::{CandidateInfo, CandidateKind, COMPONENT_RTP};

fn loopback(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
}

fn host_candidate(addr: SocketAddr, priority: u32) -> Arc<CandidateInfo> {
    Arc::new(CandidateInfo {
        foundation: "f1".into(),
        component: COMPONENT_RTP,
        address: addr.ip(),
        port: addr.port(),
        kind: CandidateKind::Host,
        related_address: None,
        related_port: None,
        priority,
    })
}

fn fast_schedule() -> ScheduleConfig {
    ScheduleConfig {
        binding_retries: 10,
        wait_unit_ms: 5,
        binding_response_retransmits: 1,
        nomination_retries: 10,
        controllee_nomination_waits: 10,
        nomination_response_retransmits: 1,
    }
}

#[tokio::test]
async fn controller_nomination_is_observed_by_the_controllee_pair_tester() {
    let mut controller_tester = CandidateTester::bind(loopback(0), Role::Controller, fast_schedule())
        .await
        .unwrap();
    let mut controllee_tester = CandidateTester::bind(loopback(0), Role::Controllee, fast_schedule())
        .await
        .unwrap();

    let local_controller = host_candidate(controller_tester.local_addr(), 100);
    let local_controllee = host_candidate(controllee_tester.local_addr(), 200);

    let pair_controller = Arc::new(CandidatePair::new(
        local_controller.clone(),
        local_controllee.clone(),
        true,
    ));
    let pair_controllee = Arc::new(CandidatePair::new(local_controllee, local_controller, false));

    controller_tester.add_pair(pair_controller.clone());
    controllee_tester.add_pair(pair_controllee.clone());

    let (tx_controller, mut rx_controller) = mpsc::unbounded_channel();
    let (tx_controllee, mut rx_controllee) = mpsc::unbounded_channel();
    let wg_controller = controller_tester.start_all(&tx_controller);
    let wg_controllee = controllee_tester.start_all(&tx_controllee);

    let controller_outcome = tokio::time::timeout(Duration::from_secs(2), rx_controller.recv())
        .await
        .expect("controller binding should not hang")
        .expect("channel stays open");
    assert!(matches!(controller_outcome, PairOutcome::ControllerSucceeded(_)));

    controller_tester
        .perform_final_nomination(&[pair_controller.clone()])
        .await
        .expect("final nomination should be accepted");
    assert_eq!(pair_controller.state(), PairState::Nominated);

    let controllee_outcome = tokio::time::timeout(Duration::from_secs(2), rx_controllee.recv())
        .await
        .expect("controllee nomination should not hang")
        .expect("channel stays open");
    assert!(matches!(controllee_outcome, PairOutcome::ControlleeNominated(_)));

    controller_tester.stop_all(wg_controller).await;
    controllee_tester.stop_all(wg_controllee).await;
}
