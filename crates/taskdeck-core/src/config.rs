use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

pub const API_BASE_URL: &str =
  "api.base_url";
pub const API_TIMEOUT_SECS: &str =
  "api.timeout_secs";
pub const NOTICE_DURATION_MS: &str =
  "notice.duration_ms";
pub const NOTICE_MAX_VISIBLE: &str =
  "notice.max_visible";
pub const SESSION_LOCATION: &str =
  "session.location";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    map.insert(
      API_BASE_URL.to_string(),
      "http://localhost:8000".to_string()
    );
    map.insert(
      API_TIMEOUT_SECS.to_string(),
      "30".to_string()
    );
    map.insert(
      NOTICE_DURATION_MS.to_string(),
      "3000".to_string()
    );
    map.insert(
      NOTICE_MAX_VISIBLE.to_string(),
      "5".to_string()
    );
    map.insert(
      SESSION_LOCATION.to_string(),
      "~/.taskdeck/session.json"
        .to_string()
    );

    Config {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc =
      resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading taskdeckrc");
      cfg.load_file(&path)?;
    } else {
      warn!(
        "no taskdeckrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_u64(
    &self,
    key: &str
  ) -> anyhow::Result<Option<u64>> {
    self
      .map
      .get(key)
      .map(|v| {
        v.trim().parse::<u64>().with_context(
          || {
            format!(
              "{key} must be a whole \
               number, got {v:?}"
            )
          }
        )
      })
      .transpose()
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      // URLs may carry a fragment, so
      // only " #" opens a trailing
      // comment.
      if let Some((before, _)) =
        line.split_once(" #")
      {
        line = before.trim();
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

/// Typed view over [`Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
  pub api_base_url:    String,
  pub api_timeout:     Duration,
  pub notice_duration: Duration,
  pub notice_max_visible: usize,
  pub session_path:    PathBuf
}

impl Settings {
  pub fn from_config(
    cfg: &Config
  ) -> anyhow::Result<Self> {
    let defaults = Config::default();
    let text = |key: &str| {
      cfg
        .get(key)
        .or_else(|| defaults.get(key))
        .unwrap_or_default()
    };
    let number =
      |key: &str| -> anyhow::Result<u64> {
        match cfg.get_u64(key)? {
          | Some(value) => Ok(value),
          | None => defaults
            .get_u64(key)?
            .ok_or_else(|| {
              anyhow!(
                "no default for {key}"
              )
            })
        }
      };

    let api_base_url =
      text(API_BASE_URL);
    if !api_base_url.starts_with("http://")
      && !api_base_url
        .starts_with("https://")
    {
      return Err(anyhow!(
        "{API_BASE_URL} must be an \
         http(s) URL, got {api_base_url:?}"
      ));
    }

    Ok(Self {
      api_base_url,
      api_timeout: Duration::from_secs(
        number(API_TIMEOUT_SECS)?
      ),
      notice_duration:
        Duration::from_millis(number(
          NOTICE_DURATION_MS
        )?),
      notice_max_visible: number(
        NOTICE_MAX_VISIBLE
      )?
        .max(1)
        as usize,
      session_path: expand_tilde(
        Path::new(&text(
          SESSION_LOCATION
        ))
      )
    })
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var("TASKDECKRC")
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory"
    );
    return Ok(None);
  };
  let candidate =
    home.join(".taskdeckrc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use tempfile::tempdir;

  use super::*;

  #[test]
  fn defaults_produce_valid_settings() {
    let settings =
      Settings::from_config(
        &Config::default()
      )
      .expect("default settings");
    assert_eq!(
      settings.api_base_url,
      "http://localhost:8000"
    );
    assert_eq!(
      settings.notice_duration,
      Duration::from_millis(3000)
    );
    assert_eq!(
      settings.notice_max_visible,
      5
    );
  }

  #[test]
  fn file_with_include_and_overrides() {
    let temp =
      tempdir().expect("tempdir");
    let extra =
      temp.path().join("extra.rc");
    fs::write(
      &extra,
      "notice.max_visible = 2\n"
    )
    .expect("write include");

    let main = temp.path().join("main.rc");
    fs::write(
      &main,
      "# taskdeck settings\n\
       api.base_url = https://tasks.example.com/#/ # trailing\n\
       include extra.rc\n"
    )
    .expect("write rc");

    let mut cfg = Config::load(Some(
      &main
    ))
    .expect("load rc");
    cfg.apply_overrides([(
      "rc.notice.duration_ms"
        .to_string(),
      "1500".to_string()
    )]);

    assert_eq!(cfg.loaded_files.len(), 2);

    let settings =
      Settings::from_config(&cfg)
        .expect("settings");
    assert_eq!(
      settings.api_base_url,
      "https://tasks.example.com/#/"
    );
    assert_eq!(
      settings.notice_max_visible,
      2
    );
    assert_eq!(
      settings.notice_duration,
      Duration::from_millis(1500)
    );
  }

  #[test]
  fn rejects_malformed_values() {
    let temp =
      tempdir().expect("tempdir");
    let bad = temp.path().join("bad.rc");
    fs::write(&bad, "just words\n")
      .expect("write rc");
    assert!(
      Config::load(Some(&bad)).is_err()
    );

    let mut cfg = Config::default();
    cfg.apply_overrides([(
      API_TIMEOUT_SECS.to_string(),
      "soon".to_string()
    )]);
    assert!(
      Settings::from_config(&cfg)
        .is_err()
    );

    let mut cfg = Config::default();
    cfg.apply_overrides([(
      API_BASE_URL.to_string(),
      "localhost".to_string()
    )]);
    assert!(
      Settings::from_config(&cfg)
        .is_err()
    );
  }
}
