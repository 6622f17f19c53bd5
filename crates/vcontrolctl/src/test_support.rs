use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

pub const DOCUMENT: &str = r#"<?xml version="1.0"?>
<V-Control xmlns:vcontrol="http://www.openv.de/vcontrol">
  <unix>
    <config>
      <serial><tty>/dev/ttyUSB0</tty></serial>
      <net>
        <port>3002</port>
        <allow ip="192.168.0.0/16"/>
      </net>
      <device ID="2098"/>
    </config>
  </unix>
  <units>
    <unit name="Temperatur">
      <abbrev>UT</abbrev>
      <calc get="V/10" set="V*10"/>
      <type>short</type>
    </unit>
  </units>
  <protocols>
    <protocol name="KW2"><pid>41</pid></protocol>
  </protocols>
  <devices>
    <device ID="2098" name="V200KW2" protocol="KW2"/>
    <device ID="2094" name="V200KW1" protocol="KW2"/>
  </devices>
  <commands>
    <!-- outside temperature -->
    <command name="getTempA" protocmd="getaddr">
      <addr>5525</addr>
      <len>2</len>
      <unit>UT</unit>
      <device ID="2094" protocmd="gettemp"/>
    </command>
  </commands>
</V-Control>"#;

/// Write [`DOCUMENT`] into a scratch directory.
pub fn write_document() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("vcontrold.xml");
    fs::write(&path, DOCUMENT).expect("write document");
    (dir, path)
}
