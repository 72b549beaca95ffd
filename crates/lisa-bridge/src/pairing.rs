//! Pairing code display.
//!
//! The bridge emits a fresh code every few seconds until the phone links the
//! device. We print the raw code; turning it into a QR image is up to the user.

const RULE_WIDTH: usize = 40;

pub fn pairing_banner(code: &str) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    format!(
        "\n{rule}\nWHATSAPP PAIRING CODE\n{rule}\n{code}\n{rule}\nOpen WhatsApp > Linked devices and scan this code\n{rule}"
    )
}

pub fn display_pairing_code(code: &str) {
    tracing::info!("WA: scan the pairing code to sign in");
    println!("{}", pairing_banner(code));
}
