//! Prompt store: schema description and analysis templates.
//!
//! Templates use `{name}` placeholders filled by [`render`]. Everything here
//! is static text; the only logic is substitution and excerpt formatting.

use crate::model::{AnalysisType, Excerpt, QueryRequest, ResultSet};

/// Database schema and value vocabulary handed to the query translator.
pub const SCHEMA_DESCRIPTION: &str = r#"Our database is the People Say database.

The People Say is an online research hub that features first-hand insights from older adults and caregivers on the issues most important to them, as well as feedback from experts on policies affecting older adults. It focuses on communities often under-consulted in policymaking: older adults of color, those who are low income, and those who live in rural areas where healthcare is not easily accessible.

**Database Schema (SQLite):**

- **peoplesay** table (main table, alias p):
  - entry_id (INTEGER, PRIMARY KEY): unique identifier for each excerpt.
  - data_unit (TEXT): the excerpt text.
  - language (TEXT): language of the interview clip (e.g. "English").
  - data_unit_title (TEXT): title of the excerpt.
  - participant_type (TEXT): e.g. "Older Adult".
  - participant_name (TEXT): name of the participant.
  - age (TEXT): age range (e.g. "65-70").
  - income_range_fpl (TEXT): income as a share of the Federal Poverty Level.
  - location_type (TEXT): e.g. "Urban".
  - participant_short_code (TEXT): internal participant code.
  - state (TEXT): e.g. "California".
  - gender (TEXT): e.g. "Man".
  - profile_picture_url (TEXT)
  - year_conducted_research (INTEGER): e.g. 2023.
  - full_transcript (TEXT): URL or path to the full transcript.

- Auxiliary tables, one row per value, each linked with entry_id → peoplesay.entry_id:
  - **subtopics_table** (alias st): subtopics (TEXT), e.g. "Dental Vision and Hearing Care [5]".
  - **topics_table** (alias t): topics (TEXT), e.g. "Healthcare [5]".
  - **common_topics_table** (alias ct): common_topics (TEXT), e.g. "Experiences Aging [7]".
  - **data_type_table** (alias dt): data_type (TEXT), e.g. "Direct Quote".
  - **insurance_table** (alias ins): insurance (TEXT), e.g. "Traditional Medicare".
  - **race_ethnicity_table** (alias re): race_ethnicity (TEXT), e.g. "Asian".

**Unique Values:**
  - Age: 65-70, 71-75, 76-80, 81-85, 90-95, Under 65
  - Income Range (FPL): 138-400% Federal Poverty Level, Above 400% Federal Poverty Level, Below 138% Federal Poverty Level
  - Location Type: Rural, Suburban, Urban
  - State: Alabama, California, Iowa, New York, Ohio, Pennsylvania, Texas
  - Gender: Man, Woman
  - Year Conducted Research: 2023
  - Language: Cantonese, English, Spanish
  - Participant Type: Caregiver or Staff, Older Adult, Subject-Matter Expert
  - Data Type: Direct Quote, Summary from Transcript, Video/Audio
  - Topics: Daily Life [1], Finances [2], Health and Well-Being [3], Health Insurance [4], Healthcare [5], Housing and Home [6], Personal Story and Identity [7], Policymaking and Innovation [8]
  - Subtopics (topic number in brackets): Access to Care [5], Acute Health Conditions and Management [3], Adult Day Care [1], Ageism [7], Aging in Place [6], Assets [2], Assistive Devices [3], Attitudes towards Policymaking and Systems [8], Beneficiary Knowledge and Information Needs [4], Benefits Navigation Support [4], Caregiver Ecosystem [1], Changing Home Needs [6], Chronic Health Conditions and Management [3], Cognitive Ability [3], Control and Autonomy [7], Cultural Competence [7], Culturally Similar Providers [5], Current Job [2], Dental Vision and Hearing Care [5], Desire to Work [2], Driving [1], Drug Coverage [4], Early Life [7], Effects of Medications [5], Elder Abuse/Neglect [1], End of Life [3], Exercise [3], Experience as Caregivers [1], Experiences Aging [7], Family Relationships [1], Federal/State/Union Insurance [4], Financial Management [2], Financial Preparedness [2], Financial Status [2], Food and Nutrition Services [1], Fraud and Financial Literacy [2], Friends [1], Gender [7], Geography [6], Health Attitudes & Perception [3], Healthcare Costs [4], Healthcare Experiences [5], Healthcare Usage [5], Holistic Care [5], Home Features [6], Home Ownership [6], Hopes for the Future [7], Household Members [6], Housing Assistance [6], Housing Experience [6], Housing Security/Stability [6], Housing Type [6], Immigration [7], Isolation [1], Job History [2], Language [7], Learning [1], Legal Issues [1], Life and Aging Priorities [7], Medicaid [4], Medical Discrimination [5], Medicare [4], Mental Health [3], Mentorship [1], Military/Veteran Insurance [4], Mindsets and Worldviews [7], No Insurance [4], Non-Medical Benefits [4], Non-Medical Costs and Bills [2], Non-Medical Insurance [2], Partnership [1], Pension [2], Pets [1], Pharmacies [5], Physical Capacity and Mobility [3], Physical Safety [3], Physical Therapy [5], Pilots and Policies [8], Plan Choice [4], Policymaking and System Improvement Challenges [8], Policymaking and System Improvement Opportunities [8], Prevention and Contributors to Health [3], Primary Care [5], Prior Expectations of Aging [7], Private/Supplemental Insurance [4], Provider Preferences [5], Purpose and Fulfillment [7], Race and Ethnicity [7], Racism [7], Religion [7], Residential Care Setting [6], Retirement [2], Routines and Activities [1], Seeing Others Age [7], Self-Advocacy [7], Senior/Community Centers [1], Sexual Activity [1], Sexuality [7], Social Security Benefits [2], Social Services and Programs [1], Social/Community Relationships [1], Specialist Care [5], Substance Use [3], System Integration/Fragmentation [5], Technology [1], Transportation [1], Trust/Satisfaction in Care [5]
  - Common Topics: same vocabulary as Subtopics, minus the least frequent entries
  - Insurance: Federal/State/Union Insurance, Medicare & Medicaid (Dual Eligible), Medicare Advantage, Medigap, Military/Veteran Insurance, Traditional Medicare
  - Race/Ethnicity: African American or Black, American Indian and Alaska Native, Asian, Hispanic or Latino/a, Non-Hispanic White"#;

const TRANSLATION_TEMPLATE: &str = r#"You are an expert in SQL and database querying. Given the following database schema and the unique values for each field, generate a SQL query to answer the user's question.

{schema}

**User Question:**
{user_query}

The retrieved excerpts will be used for a {analysis}.

**Task:**
Generate ONLY one read-only SQLite SELECT statement that retrieves the excerpts relevant to the question.
- Select from peoplesay aliased as p: p.entry_id, p.data_unit, p.data_unit_title, p.participant_name, p.age, p.income_range_fpl, p.location_type, p.state, p.gender, p.participant_type, p.language.
- Always join race_ethnicity_table re and insurance_table ins on p.entry_id and select GROUP_CONCAT(DISTINCT re.race_ethnicity) AS participant_race_ethnicity and GROUP_CONCAT(DISTINCT ins.insurance) AS participant_insurance.
- Join other auxiliary tables with the aliases above when filtering on them, and aggregate their values with GROUP_CONCAT(DISTINCT alias.column).
- GROUP BY p.entry_id and every selected p column so each excerpt appears once.
- Use LIKE for partial matches on topic fields; use = for categorical fields when the user names a value exactly.
- Never modify data: no INSERT, UPDATE, DELETE, DROP, CREATE, ALTER, ATTACH or PRAGMA.
- Output ONLY the SQL, without explanation and without markdown code fences.

**Example** for "What do older adults from Tribal communities say about specialist care?":
SELECT
    p.entry_id, p.data_unit, p.data_unit_title, p.participant_name, p.age,
    p.income_range_fpl, p.location_type, p.state, p.gender, p.participant_type, p.language,
    GROUP_CONCAT(DISTINCT re.race_ethnicity) AS participant_race_ethnicity,
    GROUP_CONCAT(DISTINCT ins.insurance) AS participant_insurance,
    GROUP_CONCAT(DISTINCT st.subtopics) AS relevant_subtopics
FROM peoplesay p
JOIN race_ethnicity_table re ON p.entry_id = re.entry_id
JOIN insurance_table ins ON p.entry_id = ins.entry_id
JOIN subtopics_table st ON p.entry_id = st.entry_id
WHERE re.race_ethnicity = 'American Indian and Alaska Native'
  AND st.subtopics LIKE '%Specialist Care%'
  AND p.participant_type = 'Older Adult'
GROUP BY p.entry_id, p.data_unit, p.data_unit_title, p.participant_name, p.age,
    p.income_range_fpl, p.location_type, p.state, p.gender, p.participant_type, p.language;"#;

const CITATION_RULES: &str = r#"Citation rules:
- Every excerpt below starts with its Source ID in square brackets, for example [12].
- Attach the Source ID to every claim, quote or theme you report, e.g. "Costs delay care [12]". Cite several sources as [12, 31].
- Only cite Source IDs that appear below. Never invent one.
- Use only the information in the excerpts. If they do not answer the question, say so."#;

const THEMATIC_TEMPLATE: &str = r#"You are an expert qualitative researcher analyzing data from the People Say database, which features first-hand insights from older adults and caregivers, particularly from underrepresented communities.

User Query: "{user_query}"

Based *only* on the following data excerpts, conduct a thematic analysis that answers the user's query:

Instructions:
1. **Identify Primary Themes**: recurring patterns, concepts, or sentiments.
2. **Extract Illustrative Quotes**: representative quotes for each theme.
3. **Note Demographic Patterns**: how themes vary across age, race/ethnicity, location type and other groups.
4. **Consider Outliers**: notable exceptions or contrasting viewpoints.
5. **Maintain Voice**: preserve the participants' own perspectives.
6. **Structure Your Analysis**: clear thematic headings.

{citation_rules}

Retrieved Data Excerpts:
---
{retrieved_data}
---

Thematic Analysis:"#;

const NARRATIVE_TEMPLATE: &str = r#"You are an expert qualitative researcher analyzing data from the People Say database, which features first-hand insights from older adults and caregivers, particularly from underrepresented communities.

User Query: "{user_query}"

Based *only* on the following data excerpts, analyze narrative elements, storylines, and personal experiences:

Instructions:
1. **Key Narratives**: story arcs in participants' accounts.
2. **Positions**: how participants position themselves and others in their stories.
3. **Temporal Aspects**: past experiences, present situations, future outlooks.
4. **Emotional Components**: emotional tone and turning points.
5. **Structure Your Analysis**: clear narrative headings. If the data cannot support a claim, state that clearly.

{citation_rules}

Retrieved Data Excerpts:
---
{retrieved_data}
---

Narrative Analysis:"#;

const DEMOGRAPHIC_TEMPLATE: &str = r#"You are a researcher analyzing how experiences vary across demographic groups in the People Say database.

User Query: "{user_query}"

Compare and contrast perspectives across demographic categories:

Instructions:
1. Identify similarities and differences by age, race/ethnicity, location type, income, insurance and gender.
2. Note challenges or opportunities mentioned by specific groups.
3. Avoid overgeneralizing from limited data; say how many excerpts support each comparison.
4. Organize findings by demographic variable or by theme, whichever shows clearer patterns.

{citation_rules}

Retrieved Data Excerpts:
---
{retrieved_data}
---

Demographic Comparison:"#;

const POLICY_TEMPLATE: &str = r#"You are a policy analyst extracting actionable insights from the People Say database.

User Query: "{user_query}"

Analyze these excerpts for policy-relevant insights:

Instructions:
1. Identify system gaps, barriers, and challenges participants describe.
2. Note participants' own suggestions for improvement.
3. Connect experiences to existing policy contexts (Medicare, Medicaid, housing assistance, ...) when the excerpts make the link evident.
4. Do not make recommendations the data does not directly support.

{citation_rules}

Retrieved Data Excerpts:
---
{retrieved_data}
---

Policy Implications Analysis:"#;

/// Substitute `{name}` placeholders. Unknown placeholders are left as-is.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

/// Template for the synthesis stage of one analysis type.
pub fn summary_template(analysis: AnalysisType) -> &'static str {
    match analysis {
        AnalysisType::Thematic => THEMATIC_TEMPLATE,
        AnalysisType::Narrative => NARRATIVE_TEMPLATE,
        AnalysisType::DemographicComparison => DEMOGRAPHIC_TEMPLATE,
        AnalysisType::PolicyImplications => POLICY_TEMPLATE,
    }
}

/// Full prompt for the query translator.
pub fn translation_prompt(request: &QueryRequest, schema: &str) -> String {
    render(
        TRANSLATION_TEMPLATE,
        &[
            ("schema", schema),
            ("analysis", request.analysis.label()),
            ("user_query", request.question.trim()),
        ],
    )
}

/// Full prompt for the synthesizer.
pub fn synthesis_prompt(request: &QueryRequest, rows: &ResultSet) -> String {
    let data = format_excerpts(rows);
    render(
        summary_template(request.analysis),
        &[
            ("citation_rules", CITATION_RULES),
            ("user_query", request.question.trim()),
            ("retrieved_data", &data),
        ],
    )
}

/// One block per excerpt, separated by `---`.
pub fn format_excerpts(rows: &ResultSet) -> String {
    rows.iter().map(format_excerpt).collect::<Vec<_>>().join("\n---\n")
}

fn format_excerpt(excerpt: &Excerpt) -> String {
    let mut block = format!("Source ID: [{}]\n", excerpt.entry_id);
    if let Some(name) = excerpt.participant_name.as_deref() {
        block.push_str(&format!("Participant: {name}\n"));
    }
    for (label, value) in excerpt.context_pairs() {
        block.push_str(&format!("{label}: {value}\n"));
    }
    block.push_str(&format!("Excerpt: {}\n", excerpt.text.trim()));
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> ResultSet {
        ResultSet::new(
            vec!["entry_id".into(), "data_unit".into()],
            vec![
                Excerpt {
                    entry_id: 3,
                    text: "The clinic is two hours away.".into(),
                    participant_name: Some("Mei".into()),
                    race_ethnicity: Some("Asian".into()),
                    ..Default::default()
                },
                Excerpt { entry_id: 9, text: "I trust my doctor.".into(), ..Default::default() },
            ],
        )
    }

    #[test]
    fn render_replaces_known_placeholders_only() {
        let out = render("{a} and {b} and {c}", &[("a", "1"), ("b", "2")]);
        assert_eq!(out, "1 and 2 and {c}");
    }

    #[test]
    fn translation_prompt_embeds_schema_and_question() {
        let req = QueryRequest::new("  How do older Asians feel about care?  ", AnalysisType::Narrative);
        let prompt = translation_prompt(&req, SCHEMA_DESCRIPTION);
        assert!(prompt.contains("race_ethnicity_table"));
        assert!(prompt.contains("\nHow do older Asians feel about care?\n"));
        assert!(prompt.contains("used for a Narrative Analysis"));
        assert!(!prompt.contains("{schema}"));
    }

    #[test]
    fn synthesis_prompt_uses_analysis_frame_and_ids() {
        for analysis in AnalysisType::ALL {
            let req = QueryRequest::new("q", analysis);
            let prompt = synthesis_prompt(&req, &rows());
            assert!(prompt.trim_end().ends_with(':'));
            assert!(prompt.contains("Source ID: [3]"));
            assert!(prompt.contains("Source ID: [9]"));
            assert!(prompt.contains("Only cite Source IDs that appear below"));
            assert!(!prompt.contains("{retrieved_data}"));
            assert!(!prompt.contains("{citation_rules}"));
        }
    }

    #[test]
    fn excerpt_block_carries_context() {
        let text = format_excerpts(&rows());
        assert!(text.contains("Participant: Mei\nRace/ethnicity: Asian\nExcerpt: The clinic is two hours away.\n"));
        assert!(text.contains("\n---\nSource ID: [9]\nExcerpt: I trust my doctor.\n"));
    }
}
