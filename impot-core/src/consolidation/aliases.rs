use crate::text::normalize_key;

/// Canonical profile field names.
pub mod fields {
    pub const NB_PARTS: &str = "nb_parts";
    pub const SITUATION_FAMILIALE: &str = "situation_familiale";
    pub const ENFANTS_A_CHARGE: &str = "enfants_a_charge";
    pub const SALARY: &str = "salary";
    pub const PROFESSIONAL_GROSS: &str = "professional_gross";
    pub const RENTAL_INCOME: &str = "rental_income";
    pub const CAPITAL_INCOME: &str = "capital_income";
    pub const DEDUCTIBLE_EXPENSES: &str = "deductible_expenses";
    pub const PER_CONTRIBUTIONS: &str = "per_contributions";
    pub const REGIME: &str = "regime";
    pub const URSSAF_DECLARED_CA: &str = "urssaf_declared_ca";
    pub const URSSAF_PAID: &str = "urssaf_paid";
    pub const URSSAF_EXPECTED: &str = "urssaf_expected";
    pub const BENEFICE_NET: &str = "benefice_net";
    pub const PAS_WITHHELD: &str = "pas_withheld";
    pub const TAX_REDUCTIONS: &str = "tax_reductions";
}

/// Legacy or ambiguous names, already normalised, and their canonical form.
const ALIASES: &[(&str, &str)] = &[
    ("expected", fields::URSSAF_EXPECTED),
    ("cotisations_attendues", fields::URSSAF_EXPECTED),
    ("parts", fields::NB_PARTS),
    ("nombre_parts", fields::NB_PARTS),
    ("nombre_de_parts", fields::NB_PARTS),
    ("situation", fields::SITUATION_FAMILIALE),
    ("statut_familial", fields::SITUATION_FAMILIALE),
    ("situation_de_famille", fields::SITUATION_FAMILIALE),
    ("enfants", fields::ENFANTS_A_CHARGE),
    ("nb_enfants", fields::ENFANTS_A_CHARGE),
    ("personnes_a_charge", fields::ENFANTS_A_CHARGE),
    ("salaires", fields::SALARY),
    ("traitements_salaires", fields::SALARY),
    ("revenus_salariaux", fields::SALARY),
    ("chiffre_affaires", fields::PROFESSIONAL_GROSS),
    ("chiffre_d_affaires", fields::PROFESSIONAL_GROSS),
    ("recettes", fields::PROFESSIONAL_GROSS),
    ("revenu_professionnel_brut", fields::PROFESSIONAL_GROSS),
    ("revenus_fonciers", fields::RENTAL_INCOME),
    ("loyers", fields::RENTAL_INCOME),
    ("revenus_capitaux_mobiliers", fields::CAPITAL_INCOME),
    ("revenus_capitaux", fields::CAPITAL_INCOME),
    ("charges", fields::DEDUCTIBLE_EXPENSES),
    ("charges_deductibles", fields::DEDUCTIBLE_EXPENSES),
    ("depenses_deductibles", fields::DEDUCTIBLE_EXPENSES),
    ("per", fields::PER_CONTRIBUTIONS),
    ("versements_per", fields::PER_CONTRIBUTIONS),
    ("epargne_retraite", fields::PER_CONTRIBUTIONS),
    ("status", fields::REGIME),
    ("regime_fiscal", fields::REGIME),
    ("regime_imposition", fields::REGIME),
    ("ca_declare", fields::URSSAF_DECLARED_CA),
    ("chiffre_affaires_declare", fields::URSSAF_DECLARED_CA),
    ("chiffre_d_affaires_declare", fields::URSSAF_DECLARED_CA),
    ("declared_ca", fields::URSSAF_DECLARED_CA),
    ("paid", fields::URSSAF_PAID),
    ("cotisations_payees", fields::URSSAF_PAID),
    ("cotisations_versees", fields::URSSAF_PAID),
    ("benefice", fields::BENEFICE_NET),
    ("resultat_fiscal", fields::BENEFICE_NET),
    ("prelevement_a_la_source", fields::PAS_WITHHELD),
    ("pas", fields::PAS_WITHHELD),
    ("retenue_a_la_source", fields::PAS_WITHHELD),
    ("reductions_impot", fields::TAX_REDUCTIONS),
    ("credits_impot", fields::TAX_REDUCTIONS),
];

/// Normalises `raw` and maps known aliases to their canonical name.
/// Unknown names come back normalised but otherwise unchanged.
pub fn canonical_field_name(raw: &str) -> String {
    let key = normalize_key(raw);
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map_or(key, |(_, canonical)| (*canonical).to_string())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn generic_expected_maps_to_urssaf_expected() {
        assert_eq!(canonical_field_name("expected"), "urssaf_expected");
    }

    #[test]
    fn aliases_are_normalised_first() {
        assert_eq!(canonical_field_name("Nombre de parts"), "nb_parts");
        assert_eq!(canonical_field_name("Chiffre d'affaires déclaré"), "urssaf_declared_ca");
        assert_eq!(canonical_field_name("CHIFFRE D'AFFAIRES"), "professional_gross");
    }

    #[test]
    fn canonical_names_pass_through() {
        assert_eq!(canonical_field_name("urssaf_paid"), "urssaf_paid");
        assert_eq!(canonical_field_name("benefice_net"), "benefice_net");
    }

    #[test]
    fn unknown_names_pass_through_normalised() {
        assert_eq!(canonical_field_name("Numéro fiscal"), "numero_fiscal");
    }

    #[test]
    fn every_alias_is_normalised_and_targets_a_canonical_name() {
        for (alias, canonical) in ALIASES {
            assert_eq!(normalize_key(alias), *alias, "alias {alias} is not normalised");
            assert_eq!(canonical_field_name(canonical), *canonical);
        }
    }
}
