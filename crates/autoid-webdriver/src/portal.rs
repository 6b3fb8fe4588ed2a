//! Page maps for the provider portals.
//!
//! Each portal is a fixed set of XPaths plus the ordered steps of its
//! inquiry form. The session walks these; nothing here talks to a browser.

use autoid_domain::{ProviderFamily, ProviderFlow};

use crate::config::{PortalCredentials, WebDriverConfig};

/// Value typed into a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Input {
    /// The flow's display name, e.g. the bank picked in a selector.
    ProviderName,
    AccountNumber,
    Nominal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Fill(&'static str, Input),
    Click(&'static str),
    /// Click if present; portals sometimes auto-select.
    TryClick(&'static str),
    /// Short pause for client-side widgets.
    Pause,
    /// Full settle delay for server round trips.
    Settle,
}

#[derive(Debug)]
pub(crate) struct Portal {
    pub name: &'static str,
    pub family: ProviderFamily,
    pub login_url: &'static str,
    pub username_field: &'static str,
    pub password_field: &'static str,
    pub login_button: &'static str,
    /// Menu clicks from the landing page to the inquiry form. The first
    /// entry only exists once logged in.
    pub to_form: &'static [&'static str],
    /// Present only while the inquiry form is showing.
    pub form_marker: &'static str,
    pub inquiry: &'static [Step],
    pub result: &'static str,
    pub logout: &'static str,
}

/// CIMB OCTO "Validasi Rekening", used for every bank inquiry.
pub(crate) const CIMB_OCTO: Portal = Portal {
    name: "CIMB OCTO",
    family: ProviderFamily::Bank,
    login_url: "https://www.cimbocto.co.id/login",
    username_field: "/html/body/div/div[2]/div/div[2]/div/div/form/div[1]/div[1]/div/input",
    password_field: "/html/body/div/div[2]/div/div[2]/div/div/form/div[2]/div[1]/div/div/input",
    login_button: "/html/body/div/div[2]/div/div[2]/div/div/form/div[3]/button",
    to_form: &[
        "/html/body/div/div/nav/ul/li[2]/a/span",
        "/html/body/div/div/nav/ul/li[2]/ul/li[2]/a",
        "/html/body/div/div/main/div/div[2]/div[3]",
    ],
    form_marker: CIMB_BANK_FIELD,
    inquiry: &[
        Step::Fill(CIMB_BANK_FIELD, Input::ProviderName),
        Step::Pause,
        Step::TryClick("/html/body/div/div/main/div/form/div[1]/div[3]/div[2]/div[1]/div[1]/div/ul/li/div"),
        Step::Pause,
        Step::Fill(
            "/html/body/div/div/main/div/form/div[1]/div[3]/div[2]/div[2]/div[1]//input",
            Input::AccountNumber,
        ),
        Step::Fill(
            "/html/body/div/div/main/div/form/div[1]/div[3]/div[2]/div[3]/div/div[1]//input",
            Input::Nominal,
        ),
        Step::Click("/html/body/div/div/main/div/form/div[2]/div/div/button"),
        Step::Settle,
    ],
    result: "/html/body/div/div/main/div/form/div[1]/div[2]/div[1]/div[2]",
    logout: "/html/body/div/div/nav/div[2]/button",
};

const CIMB_BANK_FIELD: &str =
    "/html/body/div/div/main/div/form/div[1]/div[3]/div[2]/div[1]/div[1]/div/div/input[1]";

/// KlikBCA "Validasi VA", used for every e-wallet inquiry.
pub(crate) const KLIKBCA: Portal = Portal {
    name: "KlikBCA",
    family: ProviderFamily::Ewallet,
    login_url: "https://ibank.klikbca.com/",
    username_field: "/html/body/table[2]/tbody/tr/td[2]/div/table[1]/tbody/tr[4]/td/input",
    password_field: "/html/body/table[2]/tbody/tr/td[2]/div/table[1]/tbody/tr[9]/td/input",
    login_button: "/html/body/table[2]/tbody/tr/td[2]/div/form/table/tbody/tr/td/input",
    to_form: &[
        "/html/body/table/tbody/tr/td[2]/table/tbody/tr[7]/td/a/font/b",
        "/html/body/table/tbody/tr/td[2]/table/tbody/tr[4]/td/table/tbody/tr[4]/td[2]/font/a",
    ],
    form_marker: KLIKBCA_VA_FIELD,
    inquiry: &[
        Step::Fill(KLIKBCA_VA_FIELD, Input::AccountNumber),
        Step::Click("/html/body/form/table[4]/tbody/tr[2]/td/input"),
        Step::Settle,
    ],
    result: "/html/body/form/table[3]/tbody/tr[3]/td[3]",
    logout: "/html/body/div/font/b/a",
};

const KLIKBCA_VA_FIELD: &str = "/html/body/form/table[3]/tbody/tr[3]/td[3]/input";

impl Portal {
    pub(crate) fn for_family(family: ProviderFamily) -> &'static Portal {
        match family {
            ProviderFamily::Bank => &CIMB_OCTO,
            ProviderFamily::Ewallet => &KLIKBCA,
        }
    }

    pub(crate) fn credentials<'a>(&self, config: &'a WebDriverConfig) -> &'a PortalCredentials {
        match self.family {
            ProviderFamily::Bank => &config.cimb,
            ProviderFamily::Ewallet => &config.klikbca,
        }
    }
}

/// Text typed for `input` when inquiring `account_number` through `flow`.
pub(crate) fn input_text<'a>(
    input: Input,
    flow: &'a ProviderFlow,
    account_number: &'a str,
    config: &'a WebDriverConfig,
) -> &'a str {
    match input {
        Input::ProviderName => flow.display_name(),
        Input::AccountNumber => account_number,
        Input::Nominal => &config.nominal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fills(portal: &Portal) -> Vec<Input> {
        portal
            .inquiry
            .iter()
            .filter_map(|step| match step {
                Step::Fill(_, input) => Some(*input),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn families_map_to_their_portal() {
        assert_eq!(Portal::for_family(ProviderFamily::Bank).name, "CIMB OCTO");
        assert_eq!(Portal::for_family(ProviderFamily::Ewallet).name, "KlikBCA");
        for family in [ProviderFamily::Bank, ProviderFamily::Ewallet] {
            assert_eq!(Portal::for_family(family).family, family);
        }
    }

    #[test]
    fn bank_form_picks_bank_before_account() {
        assert_eq!(
            fills(&CIMB_OCTO),
            [Input::ProviderName, Input::AccountNumber, Input::Nominal]
        );
    }

    #[test]
    fn va_form_only_takes_the_account() {
        assert_eq!(fills(&KLIKBCA), [Input::AccountNumber]);
    }

    #[test]
    fn every_inquiry_settles_before_reading() {
        for portal in [&CIMB_OCTO, &KLIKBCA] {
            assert_eq!(portal.inquiry.last(), Some(&Step::Settle));
        }
    }

    #[test]
    fn inputs_resolve_from_flow_and_config() {
        let config = WebDriverConfig::default();
        let flow = ProviderFlow::bank("Bank Central Asia");
        assert_eq!(
            input_text(Input::ProviderName, &flow, "25449874", &config),
            "Bank Central Asia"
        );
        assert_eq!(
            input_text(Input::AccountNumber, &flow, "25449874", &config),
            "25449874"
        );
        assert_eq!(input_text(Input::Nominal, &flow, "25449874", &config), "20000");
    }

    #[test]
    fn credentials_follow_family() {
        let config = WebDriverConfig {
            cimb: PortalCredentials::new("octo", "a"),
            klikbca: PortalCredentials::new("klik", "b"),
            ..Default::default()
        };
        assert_eq!(CIMB_OCTO.credentials(&config).username, "octo");
        assert_eq!(KLIKBCA.credentials(&config).username, "klik");
    }
}
