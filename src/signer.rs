//! Input signing
//!
//! Legacy inputs (p2pkh, p2sh multisig) sign the original SIGHASH_ALL
//! digest; wrapped segwit inputs (np2wkh, np2wsh) sign the BIP-143 digest,
//! which commits to the spent amount.

use crate::crypto::{double_sha256, hash160};
use crate::error::{Result, WalletError};
use crate::keys::KeyPair;
use crate::script::{
    p2pkh_script, p2sh_script, p2wpkh_program, p2wsh_program, push_data, write_varint,
    MultisigScript, OP_0,
};
use crate::transaction::{total_output_amount, Transaction, UnsignedTransaction};
use crate::unspent::{ScriptType, UnspentOutput};

pub const SIGHASH_ALL: u32 = 0x01;

/// Key material able to unlock one input.
#[derive(Debug, Clone)]
pub enum InputSigner<'a> {
    Single(&'a KeyPair),
    /// Any subset of the redeem script's keys; the first `threshold` keys in
    /// redeem order are used.
    Multisig {
        script: &'a MultisigScript,
        keys: Vec<&'a KeyPair>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub txid: String,
    pub hex: String,
    pub fee: u64,
    pub vsize: u64,
}

/// Legacy SIGHASH_ALL digest: every other scriptSig blanked, the signed
/// input's scriptSig replaced by `script_code`.
pub fn legacy_sighash(tx: &Transaction, input_index: usize, script_code: &[u8]) -> [u8; 32] {
    let mut copy = tx.clone();
    for (i, input) in copy.inputs.iter_mut().enumerate() {
        input.witness.clear();
        input.script_sig = if i == input_index {
            script_code.to_vec()
        } else {
            Vec::new()
        };
    }
    let mut preimage = copy.serialize(false);
    preimage.extend_from_slice(&SIGHASH_ALL.to_le_bytes());
    double_sha256(&preimage)
}

/// Transaction-wide hashes shared by every BIP-143 digest.
#[derive(Debug, Clone, Copy)]
pub struct SegwitHashes {
    hash_prevouts: [u8; 32],
    hash_sequence: [u8; 32],
    hash_outputs: [u8; 32],
}

impl SegwitHashes {
    pub fn new(tx: &Transaction) -> Self {
        let mut prevouts = Vec::with_capacity(tx.inputs.len() * 36);
        let mut sequences = Vec::with_capacity(tx.inputs.len() * 4);
        for input in &tx.inputs {
            prevouts.extend_from_slice(&input.outpoint());
            sequences.extend_from_slice(&input.sequence.to_le_bytes());
        }
        Self {
            hash_prevouts: double_sha256(&prevouts),
            hash_sequence: double_sha256(&sequences),
            hash_outputs: double_sha256(&tx.serialize_outputs()),
        }
    }

    /// BIP-143 preimage =
    /// version || hashPrevouts || hashSequence || outpoint || scriptCode ||
    /// amount || nSequence || hashOutputs || locktime || sighashType
    pub fn sighash(
        &self,
        tx: &Transaction,
        input_index: usize,
        script_code: &[u8],
        amount: u64,
    ) -> [u8; 32] {
        let input = &tx.inputs[input_index];
        let mut preimage = Vec::with_capacity(156 + script_code.len());
        preimage.extend_from_slice(&tx.version.to_le_bytes());
        preimage.extend_from_slice(&self.hash_prevouts);
        preimage.extend_from_slice(&self.hash_sequence);
        preimage.extend_from_slice(&input.outpoint());
        write_varint(&mut preimage, script_code.len() as u64);
        preimage.extend_from_slice(script_code);
        preimage.extend_from_slice(&amount.to_le_bytes());
        preimage.extend_from_slice(&input.sequence.to_le_bytes());
        preimage.extend_from_slice(&self.hash_outputs);
        preimage.extend_from_slice(&tx.locktime.to_le_bytes());
        preimage.extend_from_slice(&SIGHASH_ALL.to_le_bytes());
        double_sha256(&preimage)
    }
}

/// DER signature with the sighash type byte appended.
fn signature_bytes(key: &KeyPair, digest: [u8; 32]) -> Vec<u8> {
    let der = key.sign_digest(digest).serialize_der();
    let mut out = Vec::with_capacity(der.len() + 1);
    out.extend_from_slice(&der);
    out.push(SIGHASH_ALL as u8);
    out
}

/// Sign every input and serialize the result.
///
/// `signers` holds one entry per input, or a single entry used for all
/// inputs.
pub fn sign(unsigned: &UnsignedTransaction, signers: &[InputSigner<'_>]) -> Result<SignedTransaction> {
    let input_count = unsigned.inputs.len();
    if input_count == 0 {
        return Err(WalletError::Format("Prepared transaction has no inputs".into()));
    }
    if signers.is_empty() || (signers.len() != 1 && signers.len() != input_count) {
        return Err(WalletError::SignerCount {
            expected: input_count,
            supplied: signers.len(),
        });
    }

    let (Some(input_total), Some(output_total)) = (unsigned.input_total(), unsigned.output_total())
    else {
        return Err(WalletError::Format("Prepared transaction amounts overflow".into()));
    };
    check_conservation(input_total, output_total, unsigned.fee)?;

    let skeleton = unsigned.skeleton()?;
    let segwit = SegwitHashes::new(&skeleton);
    let mut signed = skeleton.clone();

    for (index, utxo) in unsigned.inputs.iter().enumerate() {
        let signer = if signers.len() == 1 {
            &signers[0]
        } else {
            &signers[index]
        };
        let unlock = unlock_input(&skeleton, &segwit, index, utxo, signer)?;
        signed.inputs[index].script_sig = unlock.script_sig;
        signed.inputs[index].witness = unlock.witness;
    }

    let signed_outputs = total_output_amount(&signed.outputs)
        .ok_or_else(|| WalletError::Assembly("Signed output total overflows".into()))?;
    check_conservation(input_total, signed_outputs, unsigned.fee)?;

    let txid = signed.txid();
    let vsize = signed.vsize();
    if let Some(rate) = unsigned.fee_rate {
        let floor = vsize.saturating_mul(rate);
        if unsigned.fee < floor {
            log::warn!(
                "Fee {} sats is below {} sat/vB for the signed size of {} vbytes ({} sats)",
                unsigned.fee,
                rate,
                vsize,
                floor
            );
        }
    }
    log::debug!(
        "Signed {} inputs: {} vbytes, fee {} sats ({:.2} sat/vB)",
        input_count,
        vsize,
        unsigned.fee,
        unsigned.fee as f64 / vsize.max(1) as f64
    );

    Ok(SignedTransaction {
        hex: signed.to_hex(),
        txid,
        fee: unsigned.fee,
        vsize,
        transaction: signed,
    })
}

fn check_conservation(input_total: u64, output_total: u64, fee: u64) -> Result<()> {
    if input_total.checked_sub(output_total) != Some(fee) {
        return Err(WalletError::Assembly(format!(
            "Inputs {} do not equal outputs {} + fee {}",
            input_total, output_total, fee
        )));
    }
    Ok(())
}

struct Unlock {
    script_sig: Vec<u8>,
    witness: Vec<Vec<u8>>,
}

fn unlock_input(
    tx: &Transaction,
    segwit: &SegwitHashes,
    index: usize,
    utxo: &UnspentOutput,
    signer: &InputSigner<'_>,
) -> Result<Unlock> {
    match (utxo.script_type, signer) {
        (ScriptType::Unknown, _) => Err(WalletError::UnsupportedScript {
            input: index,
            script_type: utxo.script_type,
        }),
        (ScriptType::P2pkh, InputSigner::Single(key)) => {
            let script_code = key.script_pubkey();
            check_locking_script(index, utxo, &script_code)?;
            let sig = signature_bytes(key, legacy_sighash(tx, index, &script_code));
            let mut script_sig = Vec::with_capacity(sig.len() + key.public_key_bytes().len() + 2);
            push_data(&mut script_sig, &sig);
            push_data(&mut script_sig, key.public_key_bytes());
            Ok(Unlock {
                script_sig,
                witness: Vec::new(),
            })
        }
        (ScriptType::NestedP2wpkh, InputSigner::Single(key)) => {
            if !key.is_compressed() {
                return Err(WalletError::KeyMismatch {
                    input: index,
                    reason: "segwit inputs require a compressed key".into(),
                });
            }
            let program = p2wpkh_program(&key.public_key_hash());
            check_locking_script(index, utxo, &p2sh_script(&hash160(&program)))?;
            let script_code = p2pkh_script(&key.public_key_hash());
            let sig = signature_bytes(key, segwit.sighash(tx, index, &script_code, utxo.amount));
            let mut script_sig = Vec::with_capacity(program.len() + 1);
            push_data(&mut script_sig, &program);
            Ok(Unlock {
                script_sig,
                witness: vec![sig, key.public_key_bytes().to_vec()],
            })
        }
        (ScriptType::P2sh, InputSigner::Multisig { script, keys }) => {
            let redeem = script.redeem_script();
            check_locking_script(index, utxo, &p2sh_script(&hash160(&redeem)))?;
            let digest = legacy_sighash(tx, index, &redeem);
            let sigs = multisig_signatures(index, script, keys, digest)?;
            let mut script_sig = vec![OP_0];
            for sig in &sigs {
                push_data(&mut script_sig, sig);
            }
            push_data(&mut script_sig, &redeem);
            Ok(Unlock {
                script_sig,
                witness: Vec::new(),
            })
        }
        (ScriptType::NestedP2wsh, InputSigner::Multisig { script, keys }) => {
            let witness_script = script.redeem_script();
            let program = p2wsh_program(&witness_script);
            check_locking_script(index, utxo, &p2sh_script(&hash160(&program)))?;
            let digest = segwit.sighash(tx, index, &witness_script, utxo.amount);
            let sigs = multisig_signatures(index, script, keys, digest)?;
            let mut script_sig = Vec::with_capacity(program.len() + 1);
            push_data(&mut script_sig, &program);
            // CHECKMULTISIG pops one extra element
            let mut witness = Vec::with_capacity(sigs.len() + 2);
            witness.push(Vec::new());
            witness.extend(sigs);
            witness.push(witness_script);
            Ok(Unlock {
                script_sig,
                witness,
            })
        }
        (script_type, InputSigner::Single(_)) => Err(WalletError::KeyMismatch {
            input: index,
            reason: format!("{:?} input needs a multisig signer", script_type),
        }),
        (script_type, InputSigner::Multisig { .. }) => Err(WalletError::KeyMismatch {
            input: index,
            reason: format!("{:?} input needs a single key", script_type),
        }),
    }
}

/// Signatures from the supplied keys, in redeem-script key order, stopping
/// at the threshold.
fn multisig_signatures(
    index: usize,
    script: &MultisigScript,
    keys: &[&KeyPair],
    digest: [u8; 32],
) -> Result<Vec<Vec<u8>>> {
    let signing: Vec<&KeyPair> = script
        .public_keys()
        .iter()
        .filter_map(|pk| keys.iter().copied().find(|k| k.public_key_bytes() == pk.as_slice()))
        .take(script.threshold())
        .collect();
    if signing.len() < script.threshold() {
        return Err(WalletError::InsufficientSignatures {
            input: index,
            required: script.threshold(),
            supplied: signing.len(),
        });
    }
    Ok(signing
        .into_iter()
        .map(|key| signature_bytes(key, digest))
        .collect())
}

/// When the indexer reported the locking script, it must be the one the
/// signer is about to satisfy.
fn check_locking_script(index: usize, utxo: &UnspentOutput, expected: &[u8]) -> Result<()> {
    if utxo.script.is_empty() {
        return Ok(());
    }
    let actual = hex::decode(&utxo.script)
        .map_err(|e| WalletError::Format(format!("Invalid script hex on input {}: {}", index, e)))?;
    if actual != expected {
        return Err(WalletError::KeyMismatch {
            input: index,
            reason: "key does not match the output's locking script".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::{Fee, SpendProfile};
    use crate::network::NetworkParameters;
    use crate::transaction::{build, BuildOptions, TxOutput};
    use secp256k1::{ecdsa::Signature, Message, PublicKey, SECP256K1};

    fn key(n: u8, compressed: bool) -> KeyPair {
        let mut bytes = [0u8; 32];
        bytes[31] = n;
        KeyPair::from_bytes(&bytes, compressed, NetworkParameters::MAINNET).unwrap()
    }

    fn unsigned(inputs: Vec<UnspentOutput>, profile: SpendProfile) -> UnsignedTransaction {
        build(
            inputs,
            vec![TxOutput::new(50_000, p2pkh_script(&[0x11; 20]))],
            &p2pkh_script(&[0x22; 20]),
            Fee::PerByte(2),
            profile,
            &NetworkParameters::MAINNET,
            BuildOptions::default(),
        )
        .unwrap()
    }

    fn utxo(tag: char, amount: u64, script_type: ScriptType) -> UnspentOutput {
        UnspentOutput::new(tag.to_string().repeat(64), 1, amount, script_type)
    }

    fn verifies(sig_with_type: &[u8], digest: [u8; 32], pubkey: &[u8]) -> bool {
        let (sighash_type, der) = sig_with_type.split_last().unwrap();
        assert_eq!(*sighash_type, SIGHASH_ALL as u8);
        let sig = Signature::from_der(der).unwrap();
        let pk = PublicKey::from_slice(pubkey).unwrap();
        SECP256K1
            .verify_ecdsa(&Message::from_digest(digest), &sig, &pk)
            .is_ok()
    }

    /// Split a script made only of direct pushes.
    fn pushes(script: &[u8]) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < script.len() {
            let (len, skip) = match script[i] {
                OP_0 => (0, 1),
                crate::script::OP_PUSHDATA1 => (script[i + 1] as usize, 2),
                n => (n as usize, 1),
            };
            out.push(script[i + skip..i + skip + len].to_vec());
            i += skip + len;
        }
        out
    }

    #[test]
    fn p2pkh_signatures_verify() {
        let k = key(1, true);
        let tx = unsigned(
            vec![
                utxo('a', 40_000, ScriptType::P2pkh).with_script(hex::encode(k.script_pubkey())),
                utxo('b', 30_000, ScriptType::P2pkh),
            ],
            SpendProfile::single(true),
        );
        let signed = sign(&tx, &[InputSigner::Single(&k)]).unwrap();
        let skeleton = tx.skeleton().unwrap();
        for (i, input) in signed.transaction.inputs.iter().enumerate() {
            let items = pushes(&input.script_sig);
            assert_eq!(items.len(), 2);
            assert_eq!(items[1], k.public_key_bytes());
            let digest = legacy_sighash(&skeleton, i, &k.script_pubkey());
            assert!(verifies(&items[0], digest, k.public_key_bytes()));
            assert!(input.witness.is_empty());
        }
        assert!(!signed.transaction.has_witness());
        assert_eq!(signed.txid, signed.transaction.txid());
    }

    #[test]
    fn signing_is_deterministic() {
        let k = key(7, false);
        let tx = unsigned(vec![utxo('c', 90_000, ScriptType::P2pkh)], SpendProfile::single(false));
        let first = sign(&tx, &[InputSigner::Single(&k)]).unwrap();
        let second = sign(&tx, &[InputSigner::Single(&k)]).unwrap();
        assert_eq!(first.hex, second.hex);
        assert_eq!(first.txid, second.txid);
    }

    #[test]
    fn estimated_fee_covers_signed_size() {
        let k = key(9, true);
        for script_type in [ScriptType::P2pkh, ScriptType::NestedP2wpkh] {
            let tx = unsigned(vec![utxo('a', 90_000, script_type)], SpendProfile::single(true));
            let signed = sign(&tx, &[InputSigner::Single(&k)]).unwrap();
            assert!(signed.fee >= signed.vsize * 2, "{:?}: {} < {} * 2", script_type, signed.fee, signed.vsize);
        }
    }

    #[test]
    fn estimated_multisig_fee_covers_signed_size() {
        for compressed in [true, false] {
            let keys = [key(1, compressed), key(2, compressed), key(3, compressed)];
            let script = MultisigScript::new(
                2,
                keys.iter().map(|k| k.public_key_bytes().to_vec()).collect(),
            )
            .unwrap();
            for script_type in [ScriptType::P2sh, ScriptType::NestedP2wsh] {
                let tx = unsigned(
                    vec![utxo('e', 100_000, script_type)],
                    SpendProfile::for_multisig(&script),
                );
                let signer = InputSigner::Multisig {
                    script: &script,
                    keys: vec![&keys[0], &keys[2]],
                };
                let signed = sign(&tx, &[signer]).unwrap();
                assert!(
                    signed.fee >= signed.vsize * 2,
                    "{:?} compressed={}: {} < {} * 2",
                    script_type,
                    compressed,
                    signed.fee,
                    signed.vsize
                );
            }
        }
    }

    #[test]
    fn legacy_sighash_depends_on_input_index() {
        let k = key(1, true);
        let tx = unsigned(
            vec![utxo('a', 40_000, ScriptType::P2pkh), utxo('b', 30_000, ScriptType::P2pkh)],
            SpendProfile::single(true),
        );
        let skeleton = tx.skeleton().unwrap();
        let first = legacy_sighash(&skeleton, 0, &k.script_pubkey());
        assert_eq!(first, legacy_sighash(&skeleton, 0, &k.script_pubkey()));
        assert_ne!(first, legacy_sighash(&skeleton, 1, &k.script_pubkey()));
    }

    #[test]
    fn nested_p2wpkh_uses_witness_and_amount() {
        let k = key(3, true);
        let locking = p2sh_script(&hash160(&p2wpkh_program(&k.public_key_hash())));
        let tx = unsigned(
            vec![utxo('d', 80_000, ScriptType::NestedP2wpkh).with_script(hex::encode(locking))],
            SpendProfile::single(true),
        );
        let signed = sign(&tx, &[InputSigner::Single(&k)]).unwrap();
        let input = &signed.transaction.inputs[0];
        assert_eq!(input.script_sig.len(), 23);
        assert_eq!(input.witness.len(), 2);
        assert_eq!(input.witness[1], k.public_key_bytes());

        let skeleton = tx.skeleton().unwrap();
        let hashes = SegwitHashes::new(&skeleton);
        let code = p2pkh_script(&k.public_key_hash());
        let digest = hashes.sighash(&skeleton, 0, &code, 80_000);
        assert!(verifies(&input.witness[0], digest, k.public_key_bytes()));
        assert_ne!(
            hashes.sighash(&skeleton, 0, &code, 80_000),
            hashes.sighash(&skeleton, 0, &code, 80_001)
        );

        // marker and flag follow the version
        let raw = hex::decode(&signed.hex).unwrap();
        assert_eq!(&raw[4..6], &[0x00, 0x01]);
        assert!(signed.vsize < raw.len() as u64);
    }

    #[test]
    fn p2sh_multisig_orders_signatures_by_redeem_keys() {
        let (a, b, c) = (key(1, true), key(2, true), key(3, true));
        let script = MultisigScript::new(
            2,
            vec![
                a.public_key_bytes().to_vec(),
                b.public_key_bytes().to_vec(),
                c.public_key_bytes().to_vec(),
            ],
        )
        .unwrap();
        let tx = unsigned(vec![utxo('e', 100_000, ScriptType::P2sh)], SpendProfile::multisig(2, 3));
        let signer = InputSigner::Multisig {
            script: &script,
            keys: vec![&c, &a],
        };
        let signed = sign(&tx, &[signer]).unwrap();
        let script_sig = &signed.transaction.inputs[0].script_sig;
        let items = pushes(script_sig);
        // OP_0, sig(a), sig(c), redeem
        assert_eq!(items.len(), 4);
        assert!(items[0].is_empty());
        assert_eq!(items[3], script.redeem_script());
        let digest = legacy_sighash(&tx.skeleton().unwrap(), 0, &script.redeem_script());
        assert!(verifies(&items[1], digest, a.public_key_bytes()));
        assert!(verifies(&items[2], digest, c.public_key_bytes()));
    }

    #[test]
    fn nested_p2wsh_multisig_builds_witness_stack() {
        let (a, b) = (key(4, true), key(5, true));
        let script = MultisigScript::new(
            1,
            vec![a.public_key_bytes().to_vec(), b.public_key_bytes().to_vec()],
        )
        .unwrap();
        let tx = unsigned(vec![utxo('f', 100_000, ScriptType::NestedP2wsh)], SpendProfile::multisig(1, 2));
        let signer = InputSigner::Multisig {
            script: &script,
            keys: vec![&b],
        };
        let signed = sign(&tx, &[signer]).unwrap();
        let input = &signed.transaction.inputs[0];
        assert_eq!(input.script_sig.len(), 35);
        assert_eq!(input.witness.len(), 3);
        assert!(input.witness[0].is_empty());
        assert_eq!(input.witness[2], script.redeem_script());
    }

    #[test]
    fn multisig_without_enough_keys_fails() {
        let (a, b, c) = (key(1, true), key(2, true), key(3, true));
        let script = MultisigScript::new(
            2,
            vec![a.public_key_bytes().to_vec(), b.public_key_bytes().to_vec()],
        )
        .unwrap();
        let tx = unsigned(vec![utxo('e', 100_000, ScriptType::P2sh)], SpendProfile::multisig(2, 2));
        // c is not part of the script and does not count
        let signer = InputSigner::Multisig {
            script: &script,
            keys: vec![&a, &c],
        };
        assert!(matches!(
            sign(&tx, &[signer]),
            Err(WalletError::InsufficientSignatures {
                input: 0,
                required: 2,
                supplied: 1
            })
        ));
    }

    #[test]
    fn unknown_script_type_is_unsupported() {
        let k = key(1, true);
        let tx = unsigned(
            vec![utxo('a', 40_000, ScriptType::P2pkh), utxo('b', 30_000, ScriptType::Unknown)],
            SpendProfile::single(true),
        );
        assert!(matches!(
            sign(&tx, &[InputSigner::Single(&k)]),
            Err(WalletError::UnsupportedScript {
                input: 1,
                script_type: ScriptType::Unknown
            })
        ));
    }

    #[test]
    fn signer_kind_must_fit_input() {
        let k = key(1, true);
        let tx = unsigned(vec![utxo('e', 100_000, ScriptType::P2sh)], SpendProfile::multisig(1, 1));
        assert!(matches!(
            sign(&tx, &[InputSigner::Single(&k)]),
            Err(WalletError::KeyMismatch { input: 0, .. })
        ));
    }

    #[test]
    fn uncompressed_key_cannot_sign_segwit() {
        let k = key(1, false);
        let tx = unsigned(vec![utxo('d', 80_000, ScriptType::NestedP2wpkh)], SpendProfile::single(true));
        assert!(matches!(
            sign(&tx, &[InputSigner::Single(&k)]),
            Err(WalletError::KeyMismatch { .. })
        ));
    }

    #[test]
    fn wrong_key_for_locking_script_is_rejected() {
        let owner = key(1, true);
        let other = key(2, true);
        let tx = unsigned(
            vec![utxo('a', 90_000, ScriptType::P2pkh).with_script(hex::encode(owner.script_pubkey()))],
            SpendProfile::single(true),
        );
        assert!(matches!(
            sign(&tx, &[InputSigner::Single(&other)]),
            Err(WalletError::KeyMismatch { input: 0, .. })
        ));
    }

    #[test]
    fn signer_count_must_match_inputs() {
        let k = key(1, true);
        let tx = unsigned(
            vec![
                utxo('a', 40_000, ScriptType::P2pkh),
                utxo('b', 30_000, ScriptType::P2pkh),
                utxo('c', 30_000, ScriptType::P2pkh),
            ],
            SpendProfile::single(true),
        );
        let signers = [InputSigner::Single(&k), InputSigner::Single(&k)];
        assert!(matches!(
            sign(&tx, &signers),
            Err(WalletError::SignerCount {
                expected: 3,
                supplied: 2
            })
        ));
        assert!(matches!(sign(&tx, &[]), Err(WalletError::SignerCount { .. })));
    }

    #[test]
    fn tampered_fee_breaks_conservation() {
        let k = key(1, true);
        let mut tx = unsigned(vec![utxo('a', 90_000, ScriptType::P2pkh)], SpendProfile::single(true));
        tx.fee += 1;
        assert!(matches!(
            sign(&tx, &[InputSigner::Single(&k)]),
            Err(WalletError::Assembly(_))
        ));
    }

    #[test]
    fn overflowing_blob_is_a_format_error() {
        let k = key(1, true);
        let mut tx = unsigned(vec![utxo('a', 90_000, ScriptType::P2pkh)], SpendProfile::single(true));
        tx.inputs = vec![utxo('a', u64::MAX, ScriptType::P2pkh), utxo('b', 2, ScriptType::P2pkh)];
        tx.outputs.clear();
        tx.change_index = None;
        tx.fee = 1;
        assert!(matches!(
            sign(&tx, &[InputSigner::Single(&k)]),
            Err(WalletError::Format(_))
        ));
    }

    #[test]
    fn blob_without_inputs_is_a_format_error() {
        let k = key(1, true);
        let mut tx = unsigned(vec![utxo('a', 90_000, ScriptType::P2pkh)], SpendProfile::single(true));
        tx.inputs.clear();
        assert!(matches!(
            sign(&tx, &[InputSigner::Single(&k)]),
            Err(WalletError::Format(_))
        ));
    }

    #[test]
    fn fee_below_carried_rate_still_signs() {
        let _ = env_logger::builder().is_test(true).try_init();
        let k = key(1, true);
        let mut tx = unsigned(vec![utxo('a', 90_000, ScriptType::P2pkh)], SpendProfile::single(true));
        assert_eq!(tx.fee_rate, Some(2));
        tx.fee_rate = Some(1_000);
        let signed = sign(&tx, &[InputSigner::Single(&k)]).unwrap();
        assert!(signed.fee < signed.vsize * 1_000);
        assert_eq!(signed.fee, tx.fee);
    }
}
