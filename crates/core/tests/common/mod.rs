//! A scriptable recording card session for protocol-order tests.

use gatehouse_card::{
    AccessRights, AesKey, Aid, CardConfig, CardError, CardSession, CommMode, KeyConfig, Uid,
};

fn comm_label(comm: CommMode) -> &'static str {
    match comm {
        CommMode::Plain => "plain",
        CommMode::Maced => "maced",
        CommMode::Enciphered => "enciphered",
    }
}

/// Records every operation as a readable line and optionally fails at a
/// scripted operation index. All operations succeed otherwise; reads
/// return zeroes.
pub struct RecordingSession {
    uid: Uid,
    fail_at: Option<(usize, CardError)>,
    /// One line per operation, in call order.
    pub ops: Vec<String>,
    /// Every write's `(file, offset, data)`, in call order.
    pub written: Vec<(u8, u32, Vec<u8>)>,
}

impl RecordingSession {
    pub fn new(uid: [u8; 7]) -> Self {
        Self {
            uid: Uid::new(uid),
            fail_at: None,
            ops: Vec::new(),
            written: Vec::new(),
        }
    }

    /// Fail the operation at `index` (0-based, counting every recorded
    /// operation) with `error`.
    pub fn failing_at(uid: [u8; 7], index: usize, error: CardError) -> Self {
        let mut session = Self::new(uid);
        session.fail_at = Some((index, error));
        session
    }

    fn record(&mut self, op: String) -> Result<(), CardError> {
        let index = self.ops.len();
        self.ops.push(op);
        match &self.fail_at {
            Some((fail_index, error)) if *fail_index == index => Err(error.clone()),
            _ => Ok(()),
        }
    }
}

impl CardSession for RecordingSession {
    fn uid(&mut self) -> Result<Uid, CardError> {
        self.record("uid".into())?;
        Ok(self.uid)
    }

    fn select_application(&mut self, aid: Aid) -> Result<(), CardError> {
        self.record(format!("select {aid}"))
    }

    fn authenticate(&mut self, key_slot: u8, key: &AesKey) -> Result<(), CardError> {
        self.record(format!("auth {key_slot} {}", hex::encode(key.as_bytes())))
    }

    fn create_application(
        &mut self,
        aid: Aid,
        settings: u8,
        keys: KeyConfig,
    ) -> Result<(), CardError> {
        self.record(format!(
            "create-app {aid} settings={settings:#04x} keys={:#04x}",
            keys.flags()
        ))
    }

    fn change_key(
        &mut self,
        key_slot: u8,
        new_key: &AesKey,
        current_key: &AesKey,
    ) -> Result<(), CardError> {
        self.record(format!(
            "change-key {key_slot} new={} old={}",
            hex::encode(new_key.as_bytes()),
            hex::encode(current_key.as_bytes())
        ))
    }

    fn change_key_settings(&mut self, settings: u8) -> Result<(), CardError> {
        self.record(format!("change-settings {settings:#04x}"))
    }

    fn create_data_file(
        &mut self,
        file: u8,
        comm: CommMode,
        rights: AccessRights,
        size: u32,
    ) -> Result<(), CardError> {
        self.record(format!(
            "create-file {file} {} rights={:#06x} size={size}",
            comm_label(comm),
            rights.raw()
        ))
    }

    fn change_file_settings(
        &mut self,
        file: u8,
        comm: CommMode,
        rights: AccessRights,
    ) -> Result<(), CardError> {
        self.record(format!(
            "change-file {file} {} rights={:#06x}",
            comm_label(comm),
            rights.raw()
        ))
    }

    fn write_data(&mut self, file: u8, offset: u32, data: &[u8]) -> Result<usize, CardError> {
        self.record(format!("write {file} at={offset} len={}", data.len()))?;
        self.written.push((file, offset, data.to_vec()));
        Ok(data.len())
    }

    fn read_data(&mut self, file: u8, offset: u32, buf: &mut [u8]) -> Result<usize, CardError> {
        self.record(format!("read {file} at={offset} len={}", buf.len()))?;
        buf.fill(0);
        Ok(buf.len())
    }

    fn set_configuration(&mut self, config: CardConfig) -> Result<(), CardError> {
        self.record(format!(
            "set-config format-disable={} random-uid={}",
            config.disable_format, config.random_uid
        ))
    }

    fn format_picc(&mut self) -> Result<(), CardError> {
        self.record("format".into())
    }

    fn disconnect(&mut self) -> Result<(), CardError> {
        self.record("disconnect".into())
    }
}
