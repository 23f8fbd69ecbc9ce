//! Test cases for the [`LoopbackInterface`].

use rstest::*;

use seriallink::{InstrumentInterface, LoopbackInterface};

/// Create a loopback interface that contains no scripted traffic.
#[fixture]
fn emp_lbk() -> LoopbackInterface {
    LoopbackInterface::new::<&str>(vec![], vec![], "\n")
}

#[rstest]
fn sendcmd() {
    let mut lbk = LoopbackInterface::new(vec!["cmd1", "cmd2"], vec![], "\n");
    lbk.sendcmd("cmd1").unwrap();
    lbk.sendcmd("cmd2").unwrap();
    lbk.finalize();
}

#[rstest]
#[should_panic]
fn sendcmd_mismatch() {
    let mut lbk = LoopbackInterface::new(vec!["cmd1"], vec![], "\n");
    let _ = lbk.sendcmd("cmd3");
}

#[rstest]
fn query() {
    let mut lbk = LoopbackInterface::new(vec!["cmd1", "cmd2"], vec!["resp1", "resp2"], "\n");
    assert_eq!(lbk.query("cmd1").unwrap(), "resp1");
    assert_eq!(lbk.query("cmd2").unwrap(), "resp2");
    lbk.finalize();
}

/// Check acknowledgment of a command sent to the loopback interface.
#[rstest]
fn check_acknowledgment() {
    let mut lbk = LoopbackInterface::new(vec!["cmd1"], vec!["ACK"], "\n");
    lbk.sendcmd("cmd1").unwrap();
    lbk.check_acknowledgment("ACK").unwrap();
    lbk.finalize();
}

/// Ensure that acknowledgment fails if the command is not acknowledged.
#[rstest]
fn check_acknowledgment_fail() {
    let mut lbk = LoopbackInterface::new(vec![], vec!["NACK"], "\n");
    assert!(lbk.check_acknowledgment("ACK").is_err());
}

/// Ensure `finalize` passes on an empty loopback interface.
#[rstest]
fn finalize_empty(mut emp_lbk: LoopbackInterface) {
    emp_lbk.finalize();
}

/// Ensure `finalize` panics if scripted traffic is left over.
#[rstest]
#[case(vec!["cmd"], vec![])]
#[case(vec![], vec!["resp"])]
#[case(vec!["cmd"], vec!["resp"])]
#[should_panic]
fn finalize_leftover_panics(#[case] from_host: Vec<&str>, #[case] from_inst: Vec<&str>) {
    let mut lbk = LoopbackInterface::new(from_host, from_inst, "\n");
    lbk.finalize();
}

#[rstest]
fn terminator(mut emp_lbk: LoopbackInterface) {
    emp_lbk.test_terminator("\n");
    emp_lbk.set_terminator("\r\n");
    emp_lbk.test_terminator("\r\n");
}

#[rstest]
#[should_panic]
fn terminator_wrong(emp_lbk: LoopbackInterface) {
    emp_lbk.test_terminator("\r\n");
}

/// A driver-set terminator is used for traffic even when it differs from the
/// interface default.
#[rstest]
fn custom_terminator_roundtrip() {
    let mut lbk = LoopbackInterface::new(vec!["SNO?"], vec!["SN012345"], "\r\n");
    lbk.set_terminator("\r\n");
    assert_eq!(lbk.query("SNO?").unwrap(), "SN012345");
    lbk.finalize();
}
